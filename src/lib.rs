//! Streaming chat-completion client for OpenAI-compatible backends.
//!
//! [`request::build`] turns a [`ProviderProfile`], [`GenerationParams`] and a
//! [`ConversationWindow`] into a wire request. [`session`] streams the answer
//! token by token; [`complete`] waits for the whole answer.

pub mod chat;
pub mod complete;
pub mod error;
pub mod extract;
pub mod prompts;
pub mod provider;
pub mod request;
pub mod session;
pub mod sse;
mod watchdog;

pub use chat::{ChatTurn, ConversationWindow, GenerationParams, Role, HISTORY_LIMIT};
pub use complete::complete;
pub use error::{ErrorInfo, ErrorKind};
pub use provider::{ProviderKind, ProviderProfile};
pub use session::{SessionHandle, StreamCallbacks, StreamEvent};
pub use tokio_util::sync::CancellationToken;
