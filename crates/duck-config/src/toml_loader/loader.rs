//! Core TOML config loading: read from path or platform default.

use crate::schema::DuckConfig;
use crate::validation;
use duck_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::default_config_path;

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// If validation fails, a warning is logged and the offending fields are
/// reset to their defaults.
pub fn load_from_path(path: &Path) -> Result<DuckConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let mut config: DuckConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::repair(&mut config) {
        warn!("config validation warning: {e} -- using defaults for invalid fields");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from `path`, returning defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<DuckConfig, ConfigError> {
    match load_from_path(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, using defaults", path.display());
            Ok(DuckConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/duck-chat/config.toml`
/// On Linux: `~/.config/duck-chat/config.toml`
///
/// A missing file yields the defaults; nothing is written.
pub fn load_default() -> Result<DuckConfig, ConfigError> {
    load_or_default(&default_config_path()?)
}
