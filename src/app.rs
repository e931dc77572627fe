use crate::{cli, config};
use anyhow::Context;
use chatstream::prompts::TemplateVars;
use chatstream::{
    session, ChatTurn, ConversationWindow, ErrorInfo, GenerationParams, ProviderProfile,
    StreamCallbacks,
};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Pick the profile for this run and apply CLI/env overrides.
pub fn resolve_profile(
    cfg: Option<&config::Config>,
    args: &cli::Args,
) -> anyhow::Result<(String, ProviderProfile)> {
    let (name, mut profile) = cfg
        .cloned()
        .unwrap_or_default()
        .profile(args.profile.as_deref())?;

    if let Some(model) = &args.model {
        profile.model = model.clone();
    }
    if let Some(key) = std::env::var("CHATSTREAM_API_KEY").ok().filter(|k| !k.is_empty()) {
        profile.api_key = Some(key);
    }
    Ok((name, profile))
}

pub fn build_params(
    args: &cli::Args,
    cfg: Option<&config::Config>,
    prompt: String,
) -> anyhow::Result<GenerationParams> {
    let prompt = if let Some(id) = &args.template {
        let template = match cfg {
            Some(cfg) => cfg.template(id)?,
            None => config::Config::default().template(id)?,
        };
        let mut vars = TemplateVars::new(&prompt);
        if let Some(tone) = &args.tone {
            vars.tone = tone;
        }
        if let Some(language) = &args.language {
            vars.language = language;
        }
        if let Some(limit) = args.word_limit {
            vars.word_limit = limit;
        }
        template.render(&vars)
    } else if let Some(action) = args.action {
        action.render(&prompt)
    } else {
        prompt
    };

    let mut params = GenerationParams::new(prompt).with_stream(!args.no_stream);
    params.system = args.system.clone();
    params.max_tokens = args.max_tokens;
    params.temperature = args.temperature;
    if let Some(path) = &args.context_file {
        let context = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read context file: {}", path.display()))?;
        params.context = Some(context);
    }
    Ok(params)
}

/// Cancels the returned token on Ctrl-C until the handle is aborted.
pub fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let t = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling request");
            t.cancel();
        }
    });
    (token, watcher)
}

/// Yields one item per Ctrl-C for as long as the receiver lives.
pub fn interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Writes tokens to stdout as they arrive and keeps the full reply.
#[derive(Debug, Default)]
struct Printer {
    reply: String,
}

impl StreamCallbacks for Printer {
    fn on_token(&mut self, text: &str) {
        self.reply.push_str(text);
        let mut out = std::io::stdout();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_done(&mut self) {
        println!();
    }

    fn on_error(&mut self, _error: ErrorInfo) {
        if !self.reply.is_empty() {
            println!();
        }
    }
}

/// Run one call, printing the answer. Returns the full reply text.
pub async fn ask(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    params: &GenerationParams,
    window: &ConversationWindow,
    cancel: &CancellationToken,
) -> Result<String, ErrorInfo> {
    if !params.stream {
        let text = chatstream::complete(http, profile, params, window, cancel).await?;
        println!("{text}");
        return Ok(text);
    }

    let mut printer = Printer::default();
    session::run(http, profile, params, window, cancel, &mut printer).await?;
    Ok(printer.reply)
}

pub fn cmd_profiles(cfg: Option<&config::Config>, selected: Option<&str>) -> anyhow::Result<()> {
    let cfg = cfg.cloned().unwrap_or_default();
    let active = cfg.profile(selected).map(|(name, _)| name).ok();

    let mut out = std::io::stdout();
    if cfg.profiles.is_empty() {
        let p = ProviderProfile::default();
        writeln!(
            out,
            "* {} ({}, {}, {}) [built-in]",
            config::DEFAULT_PROFILE,
            p.provider,
            p.model,
            p.endpoint()
        )?;
        return Ok(());
    }
    for (name, p) in &cfg.profiles {
        let mark = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        writeln!(out, "{mark} {name} ({}, {}, {})", p.provider, p.model, p.endpoint())?;
    }
    Ok(())
}

pub fn cmd_templates(cfg: Option<&config::Config>) -> anyhow::Result<()> {
    let cfg = cfg.cloned().unwrap_or_default();
    let mut out = std::io::stdout();
    for (id, t) in cfg.templates() {
        let origin = if cfg.prompts.contains_key(&id) { "config" } else { "built-in" };
        match &t.description {
            Some(desc) => writeln!(out, "{id} - {desc} [{origin}]")?,
            None => writeln!(out, "{id} [{origin}]")?,
        }
    }
    Ok(())
}

pub async fn cmd_chat(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    args: &cli::Args,
    cfg: Option<&config::Config>,
) -> anyhow::Result<()> {
    eprintln!(
        "chatting with {} ({}); Ctrl-C at the prompt, Ctrl-D or /exit to quit",
        profile.model, profile.provider
    );
    let lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupts = interrupts();
    chat_loop(http, profile, args, cfg, lines, &mut interrupts).await?;
    Ok(())
}

/// Read prompts line by line until EOF, `/exit` or an interrupt at the
/// prompt. An interrupt while a reply is streaming cancels only that turn.
/// Returns the history kept for the next turn.
pub async fn chat_loop<R>(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    args: &cli::Args,
    cfg: Option<&config::Config>,
    mut lines: Lines<R>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> anyhow::Result<ConversationWindow>
where
    R: AsyncBufRead + Unpin,
{
    let mut window = ConversationWindow::new();
    loop {
        eprint!("> ");
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            Some(()) = interrupts.recv() => {
                eprintln!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" {
            break;
        }

        let params = build_params(args, cfg, line.to_string())?;
        let cancel = CancellationToken::new();
        let res = {
            let turn = ask(http, profile, &params, &window, &cancel);
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    res = &mut turn => break res,
                    Some(()) = interrupts.recv() => {
                        tracing::info!("interrupted, cancelling request");
                        cancel.cancel();
                    }
                }
            }
        };

        match res {
            Ok(reply) => {
                window.push(ChatTurn::user(line));
                window.push(ChatTurn::assistant(reply));
                window.trim();
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(window)
}
