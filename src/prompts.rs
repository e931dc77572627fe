//! Canned prompts for common tasks.

use crate::chat::GenerationParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Quick actions applied to a piece of selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Summarize,
    Explain,
    Translate,
    Rewrite,
    Email,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Summarize,
        Action::Explain,
        Action::Translate,
        Action::Rewrite,
        Action::Email,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Explain => "explain",
            Self::Translate => "translate",
            Self::Rewrite => "rewrite",
            Self::Email => "email",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Summarize => "Summarize the following selection. Keep it concise.\n{{selection}}",
            Self::Explain => "Explain the following text in clear language:\n{{selection}}",
            Self::Translate => "Translate the following text to English:\n{{selection}}",
            Self::Rewrite => "Rewrite the text with improved clarity:\n{{selection}}",
            Self::Email => "Write an email response referencing this text:\n{{selection}}",
        }
    }

    pub fn render(self, selection: &str) -> String {
        fill(self.template(), &[("selection", selection)])
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Replace each `{{name}}` with its value. Unknown placeholders are left as is.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{{{name}}}}}"), value)
    })
}

#[derive(Debug, Clone)]
pub struct SummarizeOptions<'a> {
    pub page_title: &'a str,
    pub url: &'a str,
    pub word_limit: u32,
    pub tone: &'a str,
    pub language: &'a str,
}

impl<'a> SummarizeOptions<'a> {
    pub fn new(page_title: &'a str, url: &'a str) -> Self {
        Self {
            page_title,
            url,
            word_limit: 200,
            tone: "neutral",
            language: "English",
        }
    }
}

pub fn summarize(o: &SummarizeOptions<'_>) -> String {
    format!(
        "Summarize the current page titled \"{}\" ({}). Provide:\n\
         1. Key bullet points (max 6)\n\
         2. TL;DR (<= {} words)\n\
         3. Structured outline with headings when available.\n\
         Maintain a {} tone and reply in {}. Never fabricate facts and mention when context is missing.",
        o.page_title, o.url, o.word_limit, o.tone, o.language
    )
}

pub fn question(question: &str, language: &str) -> String {
    format!(
        "Answer the question using ONLY the provided context. If the answer is not present, say you are unsure.\n\
         Question: {question}\n\
         Reply in {language}."
    )
}

pub fn rewrite(goal: &str, audience: Option<&str>, language: &str) -> String {
    let audience = audience.unwrap_or("general");
    format!(
        "Rewrite the provided text for {audience}. Goal: {goal}. Keep factual accuracy and reply in {language}."
    )
}

pub fn email_draft(receiver: Option<&str>, language: &str) -> String {
    let receiver = receiver.unwrap_or("the recipient");
    format!(
        "Draft a concise email to {receiver}. Include subject and body. Keep it courteous, clear, and in {language}."
    )
}

pub fn meeting_minutes(language: &str) -> String {
    format!(
        "Summarize the notes as meeting minutes. Provide agenda, decisions, action items, and open questions. Respond in {language}."
    )
}

/// A named prompt with `{{tone}}`, `{{language}}`, `{{word_limit}}` and
/// `{{context}}` placeholders, loadable from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub body: String,
}

impl PromptTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            body: body.into(),
        }
    }

    fn described(name: &str, description: &str, body: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            body: body.to_string(),
        }
    }

    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        let word_limit = vars.word_limit.to_string();
        fill(
            &self.body,
            &[
                ("tone", vars.tone),
                ("language", vars.language),
                ("word_limit", &word_limit),
                ("context", vars.context),
            ],
        )
    }
}

/// Values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone)]
pub struct TemplateVars<'a> {
    pub tone: &'a str,
    pub language: &'a str,
    pub word_limit: u32,
    pub context: &'a str,
}

impl<'a> TemplateVars<'a> {
    pub fn new(context: &'a str) -> Self {
        Self {
            tone: "neutral",
            language: "English",
            word_limit: 200,
            context,
        }
    }
}

/// Templates available without any configuration, keyed by id.
pub fn builtin_templates() -> BTreeMap<String, PromptTemplate> {
    [
        (
            "summarize",
            PromptTemplate::described(
                "Summarize",
                "Concise multi-section summary",
                "Summarize the provided context as bullet points and a TL;DR. \
                 Respect the requested tone ({{tone}}) and language ({{language}}). \
                 Limit to {{word_limit}} words. Context:\n{{context}}",
            ),
        ),
        (
            "translate",
            PromptTemplate::described(
                "Translate",
                "Translate the selection",
                "Translate the provided text to {{language}} while keeping meaning and formatting. \
                 Text:\n{{context}}",
            ),
        ),
        (
            "email",
            PromptTemplate::described(
                "Email Draft",
                "Draft a professional email",
                "Write a helpful email based on the notes below. Provide subject and body. \
                 Use {{tone}} tone. Notes:\n{{context}}",
            ),
        ),
    ]
    .into_iter()
    .map(|(id, t)| (id.to_string(), t))
    .collect()
}

/// Streaming params for a task prompt grounded in `context`.
pub fn grounded(prompt: String, context: Option<String>) -> GenerationParams {
    GenerationParams {
        context,
        ..GenerationParams::new(prompt)
    }
}
