use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Number of prior turns sent with each request. Older turns are dropped.
pub const HISTORY_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: SystemTime,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered conversation history supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationWindow {
    turns: Vec<ChatTurn>,
}

impl ConversationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The last [`HISTORY_LIMIT`] turns, oldest first.
    pub fn recent(&self) -> &[ChatTurn] {
        &self.turns[self.overflow()..]
    }

    /// Drop turns that [`recent`](Self::recent) would never return.
    pub fn trim(&mut self) {
        let excess = self.overflow();
        self.turns.drain(..excess);
    }

    fn overflow(&self) -> usize {
        self.turns.len().saturating_sub(HISTORY_LIMIT)
    }
}

impl From<Vec<ChatTurn>> for ConversationWindow {
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<ChatTurn> for ConversationWindow {
    fn from_iter<I: IntoIterator<Item = ChatTurn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

/// What to ask for in a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub system: Option<String>,

    /// Retrieved context (e.g. page text) the answer should be grounded in.
    pub context: Option<String>,

    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub stream: bool,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            context: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            stream: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
