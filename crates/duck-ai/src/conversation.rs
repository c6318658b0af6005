//! Ordered user/assistant transcript.
//!
//! The service keeps no state between calls, so the whole transcript is
//! replayed on every request. Turns strictly alternate starting with a user
//! turn; the only way to break that is rejected at the mutation site.

use serde::Serialize;

use crate::{DuckError, Message, ModelType, Role};

/// JSON body of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a transcript from stored turns, checking alternation.
    pub fn from_turns(turns: Vec<Message>) -> Result<Self, DuckError> {
        if let Some(pos) = turns
            .iter()
            .enumerate()
            .position(|(i, turn)| turn.role != expected_role(i))
        {
            return Err(DuckError::TurnOrder(format!(
                "turn {} is {:?}, expected {:?}",
                pos + 1,
                turns[pos].role,
                expected_role(pos)
            )));
        }
        Ok(Self { turns })
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> Result<(), DuckError> {
        self.append(Role::User, text.into())
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) -> Result<(), DuckError> {
        self.append(Role::Assistant, text.into())
    }

    fn append(&mut self, role: Role, content: String) -> Result<(), DuckError> {
        let expected = expected_role(self.turns.len());
        if role != expected {
            return Err(DuckError::TurnOrder(format!(
                "cannot append {role:?} turn, transcript expects {expected:?}"
            )));
        }
        self.turns.push(Message { role, content });
        Ok(())
    }

    /// Keep the first `turn_count` turns.
    ///
    /// Any prefix of an alternating transcript still alternates, so the
    /// result is whole pairs, optionally followed by one unanswered user
    /// turn.
    pub fn truncate(&mut self, turn_count: usize) {
        self.turns.truncate(turn_count);
    }

    /// Drop a trailing unanswered user turn, returning it.
    pub fn pop_pending_user(&mut self) -> Option<Message> {
        if self.has_pending_user() {
            self.turns.pop()
        } else {
            None
        }
    }

    pub fn has_pending_user(&self) -> bool {
        matches!(self.turns.last(), Some(Message { role: Role::User, .. }))
    }

    /// Turn sequence plus model identifier, ready for serialization.
    pub fn to_wire_form(&self, model: ModelType) -> ChatPayload {
        ChatPayload {
            model: model.id().to_string(),
            messages: self.turns.clone(),
        }
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<Message> {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed user/assistant pairs.
    pub fn pairs(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn last_answer(&self) -> Option<&str> {
        match self.turns.last() {
            Some(Message {
                role: Role::Assistant,
                content,
            }) => Some(content.as_str()),
            _ => None,
        }
    }
}

fn expected_role(index: usize) -> Role {
    if index % 2 == 0 {
        Role::User
    } else {
        Role::Assistant
    }
}
