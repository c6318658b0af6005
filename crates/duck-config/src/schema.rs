//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckConfig {
    /// Default model, by name (`Claude`) or wire identifier (`o3-mini`).
    /// Resolution against the model catalog happens in the caller.
    pub model: Option<String>,
    /// Start with streaming answers enabled.
    pub stream: bool,
    /// Start in multi-line input mode (submit with Ctrl+D).
    pub multiline: bool,
    pub http: HttpConfig,
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overrides the built-in browser user agent.
    pub user_agent: Option<String>,
    /// Connection timeout in seconds (valid range: 1-300).
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (valid range: 1-3600). Unset means
    /// streams may run as long as the server keeps them open.
    pub timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout_secs: 10,
            timeout_secs: None,
        }
    }
}
