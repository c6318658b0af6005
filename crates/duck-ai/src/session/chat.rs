//! Protocol operations on a Session: handshake, ask, retry.

use tracing::{debug, warn};

use crate::batch::{parse_batch, BatchAnswer};
use crate::client::ChatReply;
use crate::conversation::ChatPayload;
use crate::token_log::Token;
use crate::DuckError;

use super::manager::{PendingTurn, Session};
use super::stream::{AnswerStream, Source};

const THROTTLED: u16 = 429;

impl Session {
    /// Handshake for a fresh rotating token and record it.
    pub async fn refresh_token(&mut self) -> Result<Token, DuckError> {
        let token = self.transport.fetch_token().await?;
        debug!("received fresh session token");
        self.tokens.push(token.clone());
        Ok(token)
    }

    async fn ensure_token(&mut self) -> Result<Token, DuckError> {
        match self.tokens.current() {
            Some(token) => Ok(token.clone()),
            None => self.refresh_token().await,
        }
    }

    /// Submit `payload` with `token` and return the parsed answer.
    ///
    /// The rotated token is staged before the body is looked at, so it is
    /// kept whether or not the answer turns out to be usable.
    pub async fn send_turn(
        &mut self,
        payload: &ChatPayload,
        token: &Token,
    ) -> Result<String, DuckError> {
        let reply = self.transport.submit(payload, token, false).await?;
        let ChatReply {
            status,
            token,
            body,
        } = reply;
        if let Some(token) = token {
            self.tokens.stage(token);
        }

        let text = body.into_text().await?;
        let answer = interpret(status, &text)?;
        self.note_limit(&answer);
        Ok(answer.text)
    }

    /// Ask a question and wait for the whole answer.
    ///
    /// On failure, or if the future is dropped before the answer arrives, the
    /// transcript is left exactly as it was.
    pub async fn ask(&mut self, prompt: impl Into<String>) -> Result<String, DuckError> {
        let token = self.ensure_token().await?;
        self.conversation.append_user(prompt)?;
        self.exchange(token).await
    }

    /// Ask a question and receive the answer as it is generated.
    pub async fn ask_streaming(
        &mut self,
        prompt: impl Into<String>,
    ) -> Result<AnswerStream<'_>, DuckError> {
        let token = self.ensure_token().await?;
        self.conversation.append_user(prompt)?;
        AnswerStream::open(self, token).await
    }

    /// Rewind to user turn `turn_index` and regenerate its answer.
    ///
    /// `turn_index` is clamped to the last answered turn. Index 0 starts over
    /// from a fresh handshake with only the first prompt. An empty
    /// transcript is a no-op returning an empty answer.
    pub async fn retry(&mut self, turn_index: usize) -> Result<String, DuckError> {
        match self.rewind_for_retry(turn_index).await? {
            Some(token) => self.exchange(token).await,
            None => Ok(String::new()),
        }
    }

    /// Streaming counterpart of [`Session::retry`].
    pub async fn retry_streaming(
        &mut self,
        turn_index: usize,
    ) -> Result<AnswerStream<'_>, DuckError> {
        match self.rewind_for_retry(turn_index).await? {
            Some(token) => AnswerStream::open(self, token).await,
            None => Ok(AnswerStream::new(self, Source::Empty)),
        }
    }

    /// Send the transcript (ending in a pending user turn) and record the
    /// answer, rolling the prompt back on failure or cancellation.
    async fn exchange(&mut self, token: Token) -> Result<String, DuckError> {
        let payload = self.conversation.to_wire_form(self.model);
        let mut pending = PendingTurn::new(self);
        let answer = pending.session.send_turn(&payload, &token).await?;
        pending.commit(answer.clone())?;
        Ok(answer)
    }

    /// Truncate transcript and token log for a retry, returning the token
    /// to resubmit with, or `None` when there is nothing to retry.
    async fn rewind_for_retry(&mut self, turn_index: usize) -> Result<Option<Token>, DuckError> {
        if self.conversation.is_empty() {
            return Ok(None);
        }

        let last = self
            .tokens
            .end()
            .saturating_sub(1)
            .min(self.conversation.pairs());
        let index = turn_index.min(last);
        self.limit_reached = false;

        if index == 0 || !self.tokens.holds(index - 1) {
            // No token validates this prompt any more, so start over from a
            // new handshake with the first prompt.
            let token = self.transport.fetch_token().await?;
            self.tokens.clear();
            self.tokens.push(token.clone());
            self.conversation.truncate(1);
            debug!("retry from the first prompt with a fresh token");
            return Ok(Some(token));
        }

        self.tokens.rewind(index);
        self.conversation.truncate(2 * index - 1);
        debug!(turn = index, "retry from earlier turn");
        Ok(self.tokens.current().cloned())
    }

    pub(super) fn note_limit(&mut self, answer: &BatchAnswer) {
        if answer.limit_reached {
            warn!("conversation reached the server's length limit");
            self.limit_reached = true;
        }
    }
}

/// Turn a buffered reply into an answer, letting error records in the body
/// take precedence over the bare HTTP status.
pub(super) fn interpret(status: u16, body: &str) -> Result<BatchAnswer, DuckError> {
    let parsed = parse_batch(body);
    if (200..300).contains(&status) {
        return parsed;
    }

    match parsed {
        Err(
            e @ (DuckError::RateLimited(_)
            | DuckError::ConversationLimitExceeded(_)
            | DuckError::ProtocolError(_)),
        ) => Err(e),
        _ if status == THROTTLED => Err(DuckError::RateLimited(snippet(body))),
        _ => Err(DuckError::ProtocolError(format!(
            "HTTP {status}: {}",
            snippet(body)
        ))),
    }
}

fn snippet(body: &str) -> String {
    body.trim().chars().take(200).collect()
}
