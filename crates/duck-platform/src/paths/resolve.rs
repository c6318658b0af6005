use std::path::PathBuf;

use duck_common::StorageError;

pub(super) const APP_NAME: &str = "duck-chat";

/// Returns the platform-specific configuration directory for duck-chat.
///
/// - macOS: `~/Library/Application Support/duck-chat`
/// - Linux: `$XDG_CONFIG_HOME/duck-chat` (defaults to `~/.config/duck-chat`)
/// - Windows: `%APPDATA%\duck-chat`
pub fn config_dir() -> Result<PathBuf, StorageError> {
    Ok(dirs::config_dir()
        .ok_or_else(|| StorageError::PathError("could not determine config directory".into()))?
        .join(APP_NAME))
}

/// Returns the path to the main configuration file.
///
/// Located at `config_dir()/config.toml`.
pub fn config_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Returns the directory holding saved conversation histories.
///
/// Located at `config_dir()/history`.
pub fn history_dir() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("history"))
}
