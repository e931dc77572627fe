//! Turns a profile, generation parameters and conversation history into a
//! wire-ready chat-completions request. No I/O happens here.

use crate::chat::{ConversationWindow, GenerationParams, Role};
use crate::error::ErrorInfo;
use crate::provider::{ProviderKind, ProviderProfile};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;

/// Sampling temperature used when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.4;

/// Prepended to retrieved context so the model stays grounded in it.
pub const CONTEXT_PREAMBLE: &str =
    "Context provided by the page. Answer faithfully and cite uncertainty when needed.";

/// Sent to OpenRouter to identify the calling application.
pub const APP_REFERER: &str = "https://chatstream.local";

#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: ChatCompletionRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub stream: bool,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub fn build(
    profile: &ProviderProfile,
    params: &GenerationParams,
    window: &ConversationWindow,
) -> Result<WireRequest, ErrorInfo> {
    let endpoint = profile.endpoint();
    let url = Url::parse(&endpoint).map_err(|e| {
        ErrorInfo::invalid_request(format!("invalid endpoint url: {e}"))
            .at(profile.provider_id(), &endpoint)
    })?;
    let headers = headers(profile).map_err(|e| e.at(profile.provider_id(), &endpoint))?;

    let body = ChatCompletionRequest {
        model: profile.model.clone(),
        stream: params.stream,
        temperature: params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: params.max_tokens,
        messages: messages(params, window),
    };

    Ok(WireRequest { url, headers, body })
}

/// System instruction, grounded context, recent history, then the prompt.
pub fn messages(params: &GenerationParams, window: &ConversationWindow) -> Vec<WireMessage> {
    let mut out = Vec::with_capacity(window.recent().len() + 3);
    if let Some(system) = params.system.as_deref().filter(|s| !s.is_empty()) {
        out.push(WireMessage::new(Role::System, system));
    }
    if let Some(context) = params.context.as_deref().filter(|s| !s.is_empty()) {
        out.push(WireMessage::new(
            Role::System,
            format!("{CONTEXT_PREAMBLE}\n{context}"),
        ));
    }
    out.extend(
        window
            .recent()
            .iter()
            .map(|turn| WireMessage::new(turn.role, turn.content.clone())),
    );
    out.push(WireMessage::new(Role::User, params.prompt.clone()));
    out
}

fn headers(profile: &ProviderProfile) -> Result<HeaderMap, ErrorInfo> {
    let mut h = HeaderMap::new();
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let key = profile.credential();
    match profile.provider {
        ProviderKind::OpenAi | ProviderKind::OpenRouter => {
            match key {
                Some(key) => {
                    h.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);
                }
                None => tracing::warn!(provider = %profile.provider, "profile has no api key"),
            }
            if profile.provider == ProviderKind::OpenRouter {
                h.insert(
                    HeaderName::from_static("http-referer"),
                    HeaderValue::from_static(APP_REFERER),
                );
            }
        }
        ProviderKind::Azure => match key {
            Some(key) => {
                h.insert(HeaderName::from_static("api-key"), header_value(key)?);
            }
            None => tracing::warn!(provider = %profile.provider, "profile has no api key"),
        },
        ProviderKind::Custom => {
            if let Some(key) = key {
                h.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);
            }
        }
    }

    for (name, value) in &profile.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ErrorInfo::invalid_request(format!("invalid header name {name:?}: {e}")))?;
        h.insert(name, header_value(value)?);
    }
    Ok(h)
}

fn header_value(value: &str) -> Result<HeaderValue, ErrorInfo> {
    let mut v = HeaderValue::from_str(value)
        .map_err(|e| ErrorInfo::invalid_request(format!("invalid header value: {e}")))?;
    v.set_sensitive(true);
    Ok(v)
}
