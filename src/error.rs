//! Error types surfaced by completion calls.
//!
//! Every failed call ends in exactly one [`ErrorInfo`]. The [`ErrorKind`]
//! says what went wrong; the optional fields carry whatever diagnostics were
//! available at the point of failure.

use std::fmt;

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, DNS or TLS failure, or the body stream broke.
    Transport,
    /// The server answered with a non-2xx status.
    HttpStatus,
    /// The caller cancelled the call or the timeout watchdog fired.
    Aborted,
    /// A one-shot call succeeded but produced no text.
    EmptyResponse,
    /// An SSE data line was not valid JSON, or a frame outgrew the buffer cap.
    /// Logged as the `kind` of the parser warning, never returned.
    MalformedFrame,
    /// The profile could not be turned into a valid request.
    InvalidRequest,
    /// A one-shot response body was not a JSON document.
    MalformedResponse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport failure",
            Self::HttpStatus => "http status failure",
            Self::Aborted => "request aborted",
            Self::EmptyResponse => "empty response",
            Self::MalformedFrame => "malformed frame",
            Self::InvalidRequest => "invalid request",
            Self::MalformedResponse => "malformed response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal failure of a streaming session or one-shot completion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub provider_id: Option<String>,
    pub endpoint: Option<String>,
    pub raw_body: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            provider_id: None,
            endpoint: None,
            raw_body: None,
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        Self::new(ErrorKind::Transport, err.to_string())
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, reason)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Failure for a non-2xx response. The body text doubles as the message
    /// when the server sent one.
    pub fn http_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            body.clone()
        };
        Self {
            http_status: Some(status.as_u16()),
            raw_body: Some(body),
            ..Self::new(ErrorKind::HttpStatus, message)
        }
    }

    /// Attach the provider and endpoint that produced this error.
    pub fn at(mut self, provider_id: &str, endpoint: &str) -> Self {
        self.provider_id = Some(provider_id.to_string());
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }
}
