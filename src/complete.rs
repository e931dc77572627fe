use crate::chat::{ConversationWindow, GenerationParams};
use crate::error::{ErrorInfo, ErrorKind};
use crate::extract::extract_text;
use crate::provider::ProviderProfile;
use crate::request;
use crate::watchdog::Watchdog;
use tokio_util::sync::CancellationToken;

/// One-shot completion: send a non-streaming request and return the whole
/// answer.
///
/// A 2xx response without extractable text is an `EmptyResponse` error.
pub async fn complete(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    params: &GenerationParams,
    window: &ConversationWindow,
    cancel: &CancellationToken,
) -> Result<String, ErrorInfo> {
    let watchdog = Watchdog::arm(cancel, profile.timeout());

    let params = GenerationParams {
        stream: false,
        ..params.clone()
    };
    let req = request::build(profile, &params, window)?;

    let provider = profile.provider_id();
    let endpoint = req.url.to_string();
    let at = |e: ErrorInfo| e.at(provider, &endpoint);

    tracing::debug!(
        %endpoint,
        provider,
        model = %req.body.model,
        messages = req.body.messages.len(),
        "sending completion"
    );

    let send = http
        .post(req.url)
        .headers(req.headers)
        .json(&req.body)
        .send();
    let resp = watchdog
        .guard(send)
        .await
        .map_err(at)?
        .map_err(|e| at(ErrorInfo::transport(&e)))?;

    let status = resp.status();
    let text = watchdog.guard(resp.text()).await.map_err(at)?;
    if !status.is_success() {
        return Err(at(ErrorInfo::http_status(status, text.unwrap_or_default())));
    }
    let text = text.map_err(|e| at(ErrorInfo::transport(&e)))?;

    let with_body = |kind: ErrorKind, message: String| ErrorInfo {
        http_status: Some(status.as_u16()),
        raw_body: Some(text.clone()),
        ..at(ErrorInfo::new(kind, message))
    };

    let payload: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| with_body(ErrorKind::MalformedResponse, format!("response is not JSON: {e}")))?;

    extract_text(&payload).ok_or_else(|| with_body(ErrorKind::EmptyResponse, "Empty response".into()))
}
