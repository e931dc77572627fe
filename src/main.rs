mod app;
mod cli;
mod config;
mod paths;

use anyhow::Context;
use chatstream::ConversationWindow;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let config_path = paths::config_path()?;
    let cfg = config::Config::load_optional(&config_path)?;
    tracing::debug!(?config_path, ?cfg, "resolved config");

    match args.cmd {
        Some(cli::Command::Profiles) => {
            return app::cmd_profiles(cfg.as_ref(), args.profile.as_deref())
        }
        Some(cli::Command::Templates) => return app::cmd_templates(cfg.as_ref()),
        _ => {}
    }

    let (profile_name, profile) = app::resolve_profile(cfg.as_ref(), &args)?;
    tracing::debug!(profile = %profile_name, ?profile, "selected profile");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    if let Some(cli::Command::Chat) = args.cmd {
        return app::cmd_chat(&http, &profile, &args, cfg.as_ref()).await;
    }

    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("No prompt provided. Try: chatstream \"Hello\" or `chatstream chat`");
    }

    let params = app::build_params(&args, cfg.as_ref(), prompt)?;
    let (cancel, watcher) = app::cancel_on_ctrl_c();
    let res = app::ask(&http, &profile, &params, &ConversationWindow::new(), &cancel).await;
    watcher.abort();

    res.with_context(|| format!("request via profile `{profile_name}` failed"))?;
    Ok(())
}
