//! Transport to the chat service.
//!
//! `ChatTransport` is the seam between the session protocol and the network:
//! `HttpTransport` talks to the real service, tests script replies.

mod config;
mod http;
mod transport;

pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use http::HttpTransport;
pub use transport::{ChatReply, ChatTransport, ReplyBody, TOKEN_HEADER};
