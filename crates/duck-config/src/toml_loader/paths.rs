//! Config path resolution and default file creation.

use duck_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::info;

use super::template::default_config_toml;

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    duck_platform::config_file().map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write the documented default config to `path`.
///
/// `models` lists `(name, wire id)` pairs for the comment block; `default`
/// is the name written as the active model.
pub fn create_default_config(
    path: &Path,
    models: &[(&str, &str)],
    default: &str,
) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let content = default_config_toml(models, default);

    std::fs::write(path, content).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}
