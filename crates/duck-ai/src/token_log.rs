//! Rotating session tokens, indexed by turn.
//!
//! The token at position `k` is the one that validated user turn `k + 1`;
//! position 0 comes from the handshake. With `p` completed pairs the live
//! log ends at position `p`, so rewinding the transcript to an earlier turn
//! is a head move here. A log restored from a record that kept only the
//! latest tokens starts at a later position (`offset`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-issued credential. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenLog {
    entries: Vec<Token>,
    /// Position of `entries[0]`.
    offset: usize,
    /// `entries[..head]` is live; anything past it was rewound away.
    head: usize,
    /// Token from the latest exchange, not yet tied to a turn.
    staged: Option<Token>,
}

impl TokenLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log whose every entry is live.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self::ending_at(tokens, 0)
    }

    /// Rebuild a log whose last entry sits at position `end - 1`. Logs
    /// shorter than `end` are missing their earliest positions; an empty one
    /// waits for the token at `end - 1`.
    pub fn ending_at(tokens: Vec<Token>, end: usize) -> Self {
        let head = tokens.len();
        Self {
            entries: tokens,
            offset: end.saturating_sub(head.max(1)),
            head,
            staged: None,
        }
    }

    /// Token to send with the next request: the most recently issued one.
    pub fn current(&self) -> Option<&Token> {
        self.staged.as_ref().or_else(|| self.live().last())
    }

    pub fn live(&self) -> &[Token] {
        &self.entries[..self.head]
    }

    pub fn len(&self) -> usize {
        self.head
    }

    /// Position of the first live entry.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// One past the position of the last live entry.
    pub fn end(&self) -> usize {
        self.offset + self.head
    }

    /// Whether the token for `position` is still held.
    pub fn holds(&self, position: usize) -> bool {
        (self.offset..self.end()).contains(&position)
    }

    pub fn is_empty(&self) -> bool {
        self.head == 0 && self.staged.is_none()
    }

    /// Record a token for a new turn position, discarding rewound entries.
    pub fn push(&mut self, token: Token) {
        self.entries.truncate(self.head);
        self.entries.push(token);
        self.head += 1;
        self.staged = None;
    }

    /// Hold the token returned by an exchange until its outcome is known.
    pub fn stage(&mut self, token: Token) {
        self.staged = Some(token);
    }

    /// The exchange completed a pair: the staged token starts the next turn.
    /// Without one the server did not rotate, and the current token carries
    /// over so positions stay aligned with the transcript.
    pub fn advance(&mut self) {
        let token = match self.staged.take() {
            Some(token) => token,
            None => match self.live().last() {
                Some(token) => token.clone(),
                None => return,
            },
        };
        self.push(token);
    }

    /// The exchange left the transcript where it was: the staged token
    /// replaces the one it rotated out.
    pub fn settle(&mut self) {
        let Some(token) = self.staged.take() else {
            return;
        };
        if self.head == 0 {
            self.push(token);
        } else {
            self.entries.truncate(self.head);
            self.entries[self.head - 1] = token;
        }
    }

    /// Keep only the live entries at positions before `end`.
    pub fn rewind(&mut self, end: usize) {
        self.head = self.head.min(end.saturating_sub(self.offset));
        self.staged = None;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.offset = 0;
        self.head = 0;
        self.staged = None;
    }
}
