use anyhow::Context;
use std::ffi::OsString;
use std::path::PathBuf;

/// Where config lives, by the first variable that is set:
/// `$CHATSTREAM_HOME/config`, `$XDG_CONFIG_HOME/chatstream`,
/// `$HOME/.config/chatstream`.
fn config_dir_from(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let set = |name: &str| var(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    set("CHATSTREAM_HOME")
        .map(|base| base.join("config"))
        .or_else(|| set("XDG_CONFIG_HOME").map(|xdg| xdg.join("chatstream")))
        .or_else(|| set("HOME").map(|home| home.join(".config").join("chatstream")))
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    let dir = config_dir_from(|name| std::env::var_os(name))
        .context("cannot locate a config directory: set CHATSTREAM_HOME or HOME")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
