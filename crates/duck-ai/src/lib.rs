//! Session protocol for the DuckDuckGo AI chat service.
//!
//! Provides:
//! - A rotating-token session that replays the full transcript every turn
//! - Batch and streaming (SSE) answer parsing
//! - Rewind-and-regenerate from any earlier turn
//! - A serializable session record for saving and restoring conversations

pub mod batch;
pub mod client;
pub mod conversation;
pub mod events;
pub mod model;
pub mod session;
pub mod streaming;
pub mod token_log;

pub use client::{ChatReply, ChatTransport, ClientConfig, HttpTransport, ReplyBody};
pub use conversation::{ChatPayload, Conversation};
pub use model::ModelType;
pub use session::{AnswerStream, Session, SessionRecord};
pub use token_log::{Token, TokenLog};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, thiserror::Error)]
pub enum DuckError {
    /// Server-signaled throttling; the caller may wait and try again.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// The server refuses to extend this transcript any further.
    #[error("conversation limit exceeded: {0}")]
    ConversationLimitExceeded(String),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, body: String },
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("turn out of order: {0}")]
    TurnOrder(String),
    #[error("session record error: {0}")]
    Persistence(String),
}

impl DuckError {
    pub(crate) fn malformed(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            body: body.into(),
        }
    }
}
