//! Conversation session.
//!
//! A `Session` owns the transcript, the rotating-token log and the selected
//! model, and drives every exchange with the service. Methods take
//! `&mut self`, and a streaming answer borrows the session until it is
//! dropped, so at most one protocol call is ever in flight per session.

mod chat;
mod manager;
mod record;
mod stream;

#[cfg(test)]
mod tests;

pub use manager::Session;
pub use record::SessionRecord;
pub use stream::AnswerStream;
