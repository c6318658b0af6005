//! Session struct and state management.

use std::sync::Arc;

use tracing::debug;

use crate::client::ChatTransport;
use crate::conversation::Conversation;
use crate::model::ModelType;
use crate::token_log::TokenLog;
use crate::{DuckError, Message};

/// A conversation with the service: transcript, token log and model.
pub struct Session {
    pub(super) transport: Arc<dyn ChatTransport>,
    /// Fixed for the lifetime of the session.
    pub(super) model: ModelType,
    pub(super) conversation: Conversation,
    pub(super) tokens: TokenLog,
    /// The server flagged the transcript as full on the last answer.
    pub(super) limit_reached: bool,
}

impl Session {
    pub fn new(transport: Arc<dyn ChatTransport>, model: ModelType) -> Self {
        Self {
            transport,
            model,
            conversation: Conversation::new(),
            tokens: TokenLog::new(),
            limit_reached: false,
        }
    }

    pub fn model(&self) -> ModelType {
        self.model
    }

    /// Shared handle to the transport, for building sibling sessions.
    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.transport)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Get the full conversation history.
    pub fn messages(&self) -> &[Message] {
        self.conversation.turns()
    }

    pub fn tokens(&self) -> &TokenLog {
        &self.tokens
    }

    pub fn has_token(&self) -> bool {
        self.tokens.current().is_some()
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Number of answered prompts.
    pub fn turn_count(&self) -> usize {
        self.conversation.pairs()
    }

    /// Record the answer to the pending user turn.
    pub(super) fn commit_answer(&mut self, answer: String) -> Result<(), DuckError> {
        self.conversation.append_assistant(answer)?;
        self.tokens.advance();
        debug!(pairs = self.conversation.pairs(), "answer recorded");
        Ok(())
    }

    /// Undo the pending user turn of a failed or abandoned exchange, keeping
    /// whatever token the server rotated in.
    pub(super) fn rollback_pending(&mut self) {
        if self.conversation.pop_pending_user().is_some() {
            debug!("pending prompt rolled back");
        }
        self.tokens.settle();
    }
}

/// Holds the session while a prompt waits for its answer. Dropped without a
/// [`PendingTurn::commit`], because the exchange failed or its future was
/// cancelled, it rolls the prompt back.
pub(super) struct PendingTurn<'a> {
    pub(super) session: &'a mut Session,
    committed: bool,
}

impl<'a> PendingTurn<'a> {
    pub(super) fn new(session: &'a mut Session) -> Self {
        Self {
            session,
            committed: false,
        }
    }

    pub(super) fn commit(mut self, answer: String) -> Result<(), DuckError> {
        self.session.commit_answer(answer)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.session.rollback_pending();
        }
    }
}
