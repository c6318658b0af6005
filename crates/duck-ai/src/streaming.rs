//! Server-Sent Events (SSE) line handling.
//!
//! A streamed answer arrives as `data: <payload>` lines. This module turns a
//! reqwest body into a stream of lines and decodes single lines into
//! [`ServerEvent`]s; the session layer decides what to do with them.

use std::pin::Pin;

use futures_util::{Stream, StreamExt, TryStreamExt};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::events::{decode_payload, ServerEvent};
use crate::DuckError;

const DATA_MARKER: &str = "data:";

/// Lazy, finite, non-restartable sequence of body lines.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, DuckError>> + Send>>;

/// Split a reqwest response body into lines as they arrive.
pub fn response_lines(response: reqwest::Response) -> LineStream {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
    let lines = reader.lines();

    Box::pin(futures_util::stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(DuckError::TransportError(e.to_string())), lines)),
        }
    }))
}

/// Line stream over an in-memory body.
pub fn text_lines(text: &str) -> LineStream {
    let lines: Vec<Result<String, DuckError>> =
        text.lines().map(|line| Ok(line.to_string())).collect();
    Box::pin(futures_util::stream::iter(lines))
}

/// Read the remaining lines back into one body.
pub async fn drain_lines(lines: LineStream) -> Result<String, DuckError> {
    let lines: Vec<String> = lines.try_collect().await?;
    Ok(lines.join("\n"))
}

/// Decode one stream line.
///
/// Returns `Ok(None)` for lines that carry no event: blank separators,
/// `:` comments, and other SSE fields (`event:`, `id:`, `retry:`).
pub fn decode_line(line: &str) -> Result<Option<ServerEvent>, String> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    match line.strip_prefix(DATA_MARKER) {
        Some(payload) => decode_payload(payload).map(Some),
        None => Ok(None),
    }
}
