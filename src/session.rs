//! Streaming chat completion.
//!
//! A session dispatches one request, feeds the response body through a
//! [`FrameParser`] and reports to a [`StreamCallbacks`] implementation:
//! zero or more `on_token` calls in arrival order, then exactly one of
//! `on_done` or `on_error`.

use crate::chat::{ConversationWindow, GenerationParams};
use crate::error::ErrorInfo;
use crate::provider::ProviderProfile;
use crate::request;
use crate::sse::{Frame, FrameParser};
use crate::watchdog::Watchdog;
use futures_core::stream::BoxStream;
use reqwest::header::{HeaderValue, ACCEPT};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Done,
    Error(ErrorInfo),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Token(_))
    }
}

/// Receiver of a session's events.
pub trait StreamCallbacks {
    fn on_token(&mut self, text: &str);
    fn on_done(&mut self);
    fn on_error(&mut self, error: ErrorInfo);
}

impl StreamCallbacks for mpsc::UnboundedSender<StreamEvent> {
    fn on_token(&mut self, text: &str) {
        let _ = self.send(StreamEvent::Token(text.to_string()));
    }

    fn on_done(&mut self) {
        let _ = self.send(StreamEvent::Done);
    }

    fn on_error(&mut self, error: ErrorInfo) {
        let _ = self.send(StreamEvent::Error(error));
    }
}

/// A session running on its own task.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), ErrorInfo>>,
}

impl SessionHandle {
    /// Abort this session. The callbacks see a single `Aborted` error unless
    /// the session already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session and return its terminal outcome.
    pub async fn join(self) -> Result<(), ErrorInfo> {
        match self.task.await {
            Ok(res) => res,
            Err(e) => Err(ErrorInfo::aborted(format!("session task failed: {e}"))),
        }
    }
}

/// Spawn a session. Must be called from within a tokio runtime.
///
/// The session listens on a child of `cancel`: cancelling `cancel` aborts
/// it, and [`SessionHandle::cancel`] aborts only this session.
pub fn start<C>(
    http: &reqwest::Client,
    profile: ProviderProfile,
    params: GenerationParams,
    mut callbacks: C,
    window: ConversationWindow,
    cancel: &CancellationToken,
) -> SessionHandle
where
    C: StreamCallbacks + Send + 'static,
{
    let http = http.clone();
    let token = cancel.child_token();
    let task_token = token.clone();
    let task = tokio::spawn(async move {
        run(&http, &profile, &params, &window, &task_token, &mut callbacks).await
    });
    SessionHandle {
        cancel: token,
        task,
    }
}

/// Spawn a session and expose its events as a stream.
///
/// The stream yields tokens, then the terminal event, then ends.
pub fn stream(
    http: &reqwest::Client,
    profile: ProviderProfile,
    params: GenerationParams,
    window: ConversationWindow,
    cancel: &CancellationToken,
) -> (SessionHandle, BoxStream<'static, StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = start(http, profile, params, tx, window, cancel);
    let events = Box::pin(UnboundedReceiverStream::new(rx)) as BoxStream<'static, StreamEvent>;
    (handle, events)
}

/// Drive a session to completion on the current task.
///
/// Invokes exactly one terminal callback and returns the same outcome.
pub async fn run<C>(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    params: &GenerationParams,
    window: &ConversationWindow,
    cancel: &CancellationToken,
    callbacks: &mut C,
) -> Result<(), ErrorInfo>
where
    C: StreamCallbacks + ?Sized,
{
    let res = drive(http, profile, params, window, cancel, callbacks).await;
    match &res {
        Ok(()) => {
            tracing::debug!(provider = profile.provider_id(), "stream done");
            callbacks.on_done();
        }
        Err(e) => {
            tracing::debug!(provider = profile.provider_id(), error = %e, "stream failed");
            callbacks.on_error(e.clone());
        }
    }
    res
}

async fn drive<C>(
    http: &reqwest::Client,
    profile: &ProviderProfile,
    params: &GenerationParams,
    window: &ConversationWindow,
    cancel: &CancellationToken,
    callbacks: &mut C,
) -> Result<(), ErrorInfo>
where
    C: StreamCallbacks + ?Sized,
{
    let watchdog = Watchdog::arm(cancel, profile.timeout());

    let params = GenerationParams {
        stream: true,
        ..params.clone()
    };
    let mut req = request::build(profile, &params, window)?;
    if !req.headers.contains_key(ACCEPT) {
        req.headers
            .insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    }

    let provider = profile.provider_id();
    let endpoint = req.url.to_string();
    let at = |e: ErrorInfo| e.at(provider, &endpoint);

    tracing::debug!(
        %endpoint,
        provider,
        model = %req.body.model,
        messages = req.body.messages.len(),
        "starting stream"
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
    if !status.is_success() {
        let text = watchdog.guard(resp.text()).await.map_err(at)?;
        return Err(at(ErrorInfo::http_status(status, text.unwrap_or_default())));
    }

    let mut body = resp.bytes_stream();
    let mut parser = FrameParser::new();
    loop {
        let frames = match watchdog.guard(body.next()).await.map_err(at)? {
            Some(Ok(bytes)) => parser.push(&bytes),
            Some(Err(e)) => return Err(at(ErrorInfo::transport(&e))),
            None => parser.finish(),
        };
        for frame in frames {
            match frame {
                Frame::Token(text) => callbacks.on_token(&text),
                Frame::Done => {
                    if parser.skipped() > 0 {
                        tracing::debug!(provider, skipped = parser.skipped(), "stream had malformed frames");
                    }
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(!StreamEvent::Token("x".into()).is_terminal());
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error(ErrorInfo::aborted("x")).is_terminal());
    }

    #[tokio::test]
    async fn channel_callbacks_forward_events() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
        tx.on_token("a");
        tx.on_done();
        assert_eq!(rx.recv().await, Some(StreamEvent::Token("a".into())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Done));
    }

    #[tokio::test]
    async fn invalid_profile_fails_without_io() {
        let http = reqwest::Client::new();
        let (mut tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
        let res = run(
            &http,
            &ProviderProfile::custom("::nope::", "m"),
            &GenerationParams::new("x"),
            &ConversationWindow::new(),
            &CancellationToken::new(),
            &mut tx,
        )
        .await;
        drop(tx);
        assert!(res.is_err());
        let Some(StreamEvent::Error(e)) = rx.recv().await else {
            panic!("expected error event");
        };
        assert_eq!(e.kind, crate::error::ErrorKind::InvalidRequest);
        assert_eq!(rx.recv().await, None);
    }
}
