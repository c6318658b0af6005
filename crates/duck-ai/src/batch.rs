//! Parsing of a fully buffered chat response body.
//!
//! The body is a run of `data: <payload>` records separated by blank lines.
//! Fragments are concatenated in arrival order.

use crate::events::{decode_payload, error_for, ServerEvent};
use crate::DuckError;

const RECORD_DELIMITER: &str = "\n\n";
const DATA_MARKER: &str = "data:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchAnswer {
    pub text: String,
    /// The server marked the conversation as full.
    pub limit_reached: bool,
}

/// Parse a complete response body into the answer text.
///
/// An empty body is an empty answer. Error records are mapped onto the
/// error taxonomy; anything that is not a well-formed record yields
/// `MalformedResponse` carrying the raw body.
pub fn parse_batch(body: &str) -> Result<BatchAnswer, DuckError> {
    let normalized = body.replace("\r\n", "\n");
    let mut answer = BatchAnswer::default();
    let mut done = false;

    for record in normalized.split(RECORD_DELIMITER) {
        let record = record.trim();
        if record.is_empty() {
            continue;
        }

        let Some(payload) = record.strip_prefix(DATA_MARKER) else {
            return Err(DuckError::malformed(
                format!("record without {DATA_MARKER} marker: {record:?}"),
                body,
            ));
        };

        match decode_payload(payload).map_err(|reason| DuckError::malformed(reason, body))? {
            ServerEvent::Fragment(text) if !done => answer.text.push_str(&text),
            ServerEvent::Fragment(_) => {}
            ServerEvent::Done => done = true,
            ServerEvent::LimitReached => {
                answer.limit_reached = true;
                done = true;
            }
            ServerEvent::Error { status, kind } => return Err(error_for(status, kind)),
        }
    }

    Ok(answer)
}
