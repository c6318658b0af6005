//! Persisted form of a session.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::client::ChatTransport;
use crate::conversation::Conversation;
use crate::model::ModelType;
use crate::token_log::{Token, TokenLog};
use crate::{DuckError, Message};

use super::manager::Session;

/// Everything needed to pick a conversation up again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub model: ModelType,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Live token log, oldest first. Older files stored only the current
    /// token as a single `vqd` string.
    #[serde(default, alias = "vqd", deserialize_with = "one_or_many")]
    pub tokens: Vec<Token>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Token>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tokens {
        One(Token),
        Many(Vec<Token>),
    }

    Ok(match Option::<Tokens>::deserialize(deserializer)? {
        Some(Tokens::One(token)) if token.as_str().is_empty() => Vec::new(),
        Some(Tokens::One(token)) => vec![token],
        Some(Tokens::Many(tokens)) => tokens,
        None => Vec::new(),
    })
}

impl Session {
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            model: self.model,
            messages: self.conversation.turns().to_vec(),
            tokens: self.tokens.live().to_vec(),
        }
    }

    /// Restore a session, checking that the transcript alternates.
    ///
    /// Tokens beyond one per answered turn plus the handshake cannot belong
    /// to this transcript and are dropped. A shorter list is taken to be the
    /// newest tokens, so earlier turns can only be retried from a fresh
    /// handshake.
    pub fn from_record(
        transport: Arc<dyn ChatTransport>,
        record: SessionRecord,
    ) -> Result<Self, DuckError> {
        let SessionRecord {
            model,
            messages,
            mut tokens,
        } = record;

        let conversation = Conversation::from_turns(messages)?;
        if conversation.has_pending_user() {
            return Err(DuckError::Persistence(
                "stored transcript ends with an unanswered prompt".into(),
            ));
        }

        let limit = conversation.pairs() + 1;
        if tokens.len() > limit {
            warn!(
                stored = tokens.len(),
                kept = limit,
                "dropping tokens past the stored transcript"
            );
            tokens.truncate(limit);
        }

        let mut session = Session::new(transport, model);
        session.conversation = conversation;
        // Older records keep only the newest tokens; line them up with the
        // end of the transcript.
        session.tokens = TokenLog::ending_at(tokens, limit);
        Ok(session)
    }

    pub fn serialize(&self) -> Result<String, DuckError> {
        serde_json::to_string_pretty(&self.to_record())
            .map_err(|e| DuckError::Persistence(e.to_string()))
    }

    pub fn deserialize(json: &str, transport: Arc<dyn ChatTransport>) -> Result<Self, DuckError> {
        let record: SessionRecord =
            serde_json::from_str(json).map_err(|e| DuckError::Persistence(e.to_string()))?;
        Self::from_record(transport, record)
    }
}
