//! Decoding of individual server event records.
//!
//! Both the batch and the streaming body carry the same records: a JSON
//! object with an answer fragment or an error, or one of the bare sentinels.

use serde::Deserialize;

use crate::DuckError;

pub const DONE_SENTINEL: &str = "[DONE]";
pub const LIMIT_SENTINEL: &str = "[LIMIT_CONVERSATION]";
pub const CONVERSATION_LIMIT_CODE: &str = "ERR_CONVERSATION_LIMIT";

const THROTTLED: u16 = 429;

/// One decoded event record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A piece of the answer; may be empty.
    Fragment(String),
    /// The answer is complete.
    Done,
    /// The answer is complete and the conversation cannot grow any further.
    LimitReached,
    /// The server reported a failure.
    Error {
        status: Option<u16>,
        kind: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Decode the payload that follows a `data:` marker.
pub fn decode_payload(payload: &str) -> Result<ServerEvent, String> {
    let payload = payload.trim();
    match payload {
        DONE_SENTINEL => return Ok(ServerEvent::Done),
        LIMIT_SENTINEL => return Ok(ServerEvent::LimitReached),
        _ => {}
    }

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| format!("unparseable event {payload:?}: {e}"))?;
    if !value.is_object() {
        return Err(format!("event is not an object: {payload:?}"));
    }
    let record: RawRecord =
        serde_json::from_value(value).map_err(|e| format!("unexpected event shape: {e}"))?;

    if record.action.as_deref() == Some("error") {
        let kind = record.kind.unwrap_or_else(|| payload.to_string());
        return Ok(ServerEvent::Error {
            status: record.status,
            kind,
        });
    }

    Ok(ServerEvent::Fragment(record.message.unwrap_or_default()))
}

/// Map an error record onto the error taxonomy.
pub fn error_for(status: Option<u16>, kind: String) -> DuckError {
    match status {
        Some(THROTTLED) if kind == CONVERSATION_LIMIT_CODE => {
            DuckError::ConversationLimitExceeded(kind)
        }
        Some(THROTTLED) => DuckError::RateLimited(kind),
        _ => DuckError::ProtocolError(kind),
    }
}
