use chatstream::prompts::Action;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stream chat completions from OpenAI-compatible endpoints
#[derive(Debug, Parser)]
#[command(name = "chatstream")]
#[command(version)]
#[command(about = "Stream chat completions from OpenAI-compatible endpoints", long_about = None)]
pub struct Args {
    /// Profile name from config.toml (default: `active`)
    #[arg(short = 'p', long = "profile", global = true)]
    pub profile: Option<String>,

    /// Override the profile's model
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// System instruction
    #[arg(long = "system", global = true)]
    pub system: Option<String>,

    /// File whose contents are sent as grounding context
    #[arg(long = "context-file", value_name = "FILE", global = true)]
    pub context_file: Option<PathBuf>,

    /// Apply a quick action (summarize, explain, translate, rewrite, email) to the prompt text
    #[arg(long = "action", global = true, conflicts_with = "template")]
    pub action: Option<Action>,

    /// Render the prompt text through a named template (built-in or `[prompts.<id>]`)
    #[arg(short = 't', long = "template", value_name = "ID", global = true)]
    pub template: Option<String>,

    /// Tone substituted for `{{tone}}` in templates
    #[arg(long = "tone", global = true)]
    pub tone: Option<String>,

    /// Language substituted for `{{language}}` in templates
    #[arg(long = "language", global = true)]
    pub language: Option<String>,

    /// Value substituted for `{{word_limit}}` in templates
    #[arg(long = "word-limit", global = true)]
    pub word_limit: Option<u32>,

    #[arg(long = "max-tokens", global = true)]
    pub max_tokens: Option<u32>,

    #[arg(long = "temperature", global = true)]
    pub temperature: Option<f64>,

    /// Wait for the whole answer instead of streaming
    #[arg(long = "no-stream", global = true)]
    pub no_stream: bool,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Prompt text (positional) (used when no subcommand is given)
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List configured profiles
    Profiles,

    /// List available prompt templates
    Templates,

    /// Interactive chat that keeps recent turns as context
    Chat,
}
