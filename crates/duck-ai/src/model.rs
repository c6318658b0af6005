//! The closed set of backend models the service accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "gpt-4o-mini", alias = "GPT4o")]
    Gpt4o,
    #[serde(rename = "claude-3-haiku-20240307", alias = "Claude")]
    Claude,
    #[serde(rename = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo", alias = "Llama")]
    Llama,
    #[default]
    #[serde(rename = "mistralai/Mistral-Small-24B-Instruct-2501", alias = "Mistral")]
    Mistral,
    #[serde(rename = "o3-mini", alias = "o3mini")]
    O3Mini,
}

/// Name of a model the service no longer offers.
const RETIRED: &[&str] = &["GPT3"];

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        ModelType::Gpt4o,
        ModelType::Claude,
        ModelType::Llama,
        ModelType::Mistral,
        ModelType::O3Mini,
    ];

    /// Short name used in config files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ModelType::Gpt4o => "GPT4o",
            ModelType::Claude => "Claude",
            ModelType::Llama => "Llama",
            ModelType::Mistral => "Mistral",
            ModelType::O3Mini => "o3mini",
        }
    }

    /// Identifier sent to the service.
    pub fn id(self) -> &'static str {
        match self {
            ModelType::Gpt4o => "gpt-4o-mini",
            ModelType::Claude => "claude-3-haiku-20240307",
            ModelType::Llama => "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo",
            ModelType::Mistral => "mistralai/Mistral-Small-24B-Instruct-2501",
            ModelType::O3Mini => "o3-mini",
        }
    }

    /// `(name, id)` pairs for every model, in menu order.
    pub fn catalog() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|m| (m.name(), m.id())).collect()
    }

    /// Resolve a configured model value, falling back to the default for
    /// anything unrecognized.
    pub fn resolve_or_default(value: &str) -> ModelType {
        match value.parse() {
            Ok(model) => model,
            Err(UnknownModel { retired: true, .. }) => {
                tracing::warn!("model {value} is deprecated, using {}", ModelType::default());
                ModelType::default()
            }
            Err(e) => {
                tracing::warn!("{e}, using {}", ModelType::default());
                ModelType::default()
            }
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model {value:?}")]
pub struct UnknownModel {
    pub value: String,
    /// The value names a model that used to exist.
    pub retired: bool,
}

impl FromStr for ModelType {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ModelType::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s) || m.id() == s)
            .ok_or_else(|| UnknownModel {
                value: s.to_string(),
                retired: RETIRED.iter().any(|r| r.eq_ignore_ascii_case(s)),
            })
    }
}
