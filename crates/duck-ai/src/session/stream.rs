//! Incremental delivery of one answer.

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::client::{ChatReply, ReplyBody};
use crate::events::{error_for, ServerEvent};
use crate::streaming::{decode_line, LineStream};
use crate::token_log::Token;
use crate::DuckError;

use super::chat::interpret;
use super::manager::Session;

/// Where the chunks come from.
pub(super) enum Source {
    /// The request has not been answered yet.
    Pending,
    /// Live event stream lines.
    Lines(LineStream),
    /// The server answered with a complete body; yielded as one chunk.
    Buffered(Option<String>),
    /// Nothing to produce (retry on an empty transcript).
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Abandoned,
}

/// One streamed answer, holding the session until it is finished or dropped.
///
/// The answer is appended to the transcript only once the server signals
/// completion. Dropping the stream before that, or any error, discards the
/// partial answer together with its prompt.
pub struct AnswerStream<'a> {
    session: &'a mut Session,
    source: Source,
    answer: String,
    state: State,
}

enum Step {
    Line(String),
    Chunk(String),
    End,
    Failed(DuckError),
}

impl<'a> AnswerStream<'a> {
    pub(super) fn new(session: &'a mut Session, source: Source) -> Self {
        let state = match source {
            Source::Empty => State::Committed,
            _ => State::Open,
        };
        Self {
            session,
            source,
            answer: String::new(),
            state,
        }
    }

    /// Submit the pending prompt and start reading its answer. The prompt is
    /// rolled back if this fails or is dropped before the reply arrives.
    pub(super) async fn open(session: &'a mut Session, token: Token) -> Result<Self, DuckError> {
        let payload = session.conversation.to_wire_form(session.model);
        let transport = session.transport();
        let mut stream = Self::new(session, Source::Pending);

        let reply = match transport.submit(&payload, &token, true).await {
            Ok(reply) => reply,
            Err(e) => return Err(stream.fail(e)),
        };
        let success = reply.is_success();
        let ChatReply {
            status,
            token,
            body,
        } = reply;
        if let Some(token) = token {
            stream.session.tokens.stage(token);
        }

        stream.source = match body {
            ReplyBody::Stream(lines) if success => Source::Lines(lines),
            body => {
                let buffered = match body.into_text().await {
                    Ok(text) => interpret(status, &text),
                    Err(e) => Err(e),
                };
                match buffered {
                    Ok(answer) => {
                        stream.session.note_limit(&answer);
                        Source::Buffered(Some(answer.text))
                    }
                    Err(e) => return Err(stream.fail(e)),
                }
            }
        };
        Ok(stream)
    }

    /// Next non-empty piece of the answer, or `None` once it is complete.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, DuckError> {
        loop {
            if self.state != State::Open {
                return Ok(None);
            }

            let step = match &mut self.source {
                Source::Lines(lines) => match lines.next().await {
                    Some(Ok(line)) => Step::Line(line),
                    Some(Err(e)) => Step::Failed(e),
                    None => Step::End,
                },
                Source::Buffered(text) => match text.take() {
                    Some(text) => Step::Chunk(text),
                    None => Step::End,
                },
                Source::Pending => Step::Failed(DuckError::ProtocolError(
                    "answer read before the request was sent".into(),
                )),
                Source::Empty => Step::End,
            };

            match step {
                Step::Chunk(text) => {
                    self.answer.push_str(&text);
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Some(text));
                }
                Step::End => {
                    self.finish()?;
                    return Ok(None);
                }
                Step::Failed(e) => return Err(self.fail(e)),
                Step::Line(line) => match decode_line(&line) {
                    Ok(None) => continue,
                    Ok(Some(ServerEvent::Fragment(text))) => {
                        if text.is_empty() {
                            continue;
                        }
                        self.answer.push_str(&text);
                        return Ok(Some(text));
                    }
                    Ok(Some(ServerEvent::Done)) => {
                        self.finish()?;
                        return Ok(None);
                    }
                    Ok(Some(ServerEvent::LimitReached)) => {
                        warn!("conversation reached the server's length limit");
                        self.session.limit_reached = true;
                        self.finish()?;
                        return Ok(None);
                    }
                    Ok(Some(ServerEvent::Error { status, kind })) => {
                        return Err(self.fail(error_for(status, kind)));
                    }
                    Err(reason) => return Err(self.fail(DuckError::malformed(reason, line))),
                },
            }
        }
    }

    /// Drain the stream and return the whole answer.
    pub async fn collect(mut self) -> Result<String, DuckError> {
        while self.next_chunk().await?.is_some() {}
        Ok(self.answer.clone())
    }

    /// Text received so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_finished(&self) -> bool {
        self.state != State::Open
    }

    fn finish(&mut self) -> Result<(), DuckError> {
        self.state = State::Committed;
        debug!(chars = self.answer.len(), "stream complete");
        self.session.commit_answer(self.answer.clone())
    }

    fn fail(&mut self, error: DuckError) -> DuckError {
        self.state = State::Abandoned;
        self.session.rollback_pending();
        error
    }
}

impl Drop for AnswerStream<'_> {
    fn drop(&mut self) {
        if self.state == State::Open {
            debug!("stream dropped before completion");
            self.session.rollback_pending();
        }
    }
}
