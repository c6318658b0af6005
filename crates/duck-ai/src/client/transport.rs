//! Transport trait and reply types.

use std::fmt;

use async_trait::async_trait;

use crate::conversation::ChatPayload;
use crate::streaming::{drain_lines, LineStream};
use crate::token_log::Token;
use crate::DuckError;

/// Header carrying the rotating session token, both ways.
pub const TOKEN_HEADER: &str = "x-vqd-4";

/// Response body of a chat exchange.
pub enum ReplyBody {
    /// Fully buffered body.
    Batch(String),
    /// Event stream, consumed line by line.
    Stream(LineStream),
}

impl ReplyBody {
    /// Buffer whatever is left of the body.
    pub async fn into_text(self) -> Result<String, DuckError> {
        match self {
            ReplyBody::Batch(text) => Ok(text),
            ReplyBody::Stream(lines) => drain_lines(lines).await,
        }
    }
}

impl fmt::Debug for ReplyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyBody::Batch(text) => f.debug_tuple("Batch").field(&text.len()).finish(),
            ReplyBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A chat exchange as seen by the session.
#[derive(Debug)]
pub struct ChatReply {
    pub status: u16,
    /// Rotated token, if the server sent one.
    pub token: Option<Token>,
    pub body: ReplyBody,
}

impl ChatReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Handshake for a fresh rotating token.
    async fn fetch_token(&self) -> Result<Token, DuckError>;

    /// Submit the full transcript. `stream` asks for the body as an event
    /// stream; the transport may still return a buffered body.
    async fn submit(
        &self,
        payload: &ChatPayload,
        token: &Token,
        stream: bool,
    ) -> Result<ChatReply, DuckError>;
}
