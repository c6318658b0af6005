//! `--generate`: write the documented default config file.

use std::path::{Path, PathBuf};

use duck_ai::ModelType;
use duck_common::ConfigError;

#[derive(Debug, PartialEq, Eq)]
pub enum Generated {
    Written(PathBuf),
    /// An existing file is never overwritten.
    AlreadyExists(PathBuf),
}

pub fn write_default_config(path: &Path) -> Result<Generated, ConfigError> {
    if path.exists() {
        return Ok(Generated::AlreadyExists(path.to_path_buf()));
    }
    duck_config::create_default_config(
        path,
        &ModelType::catalog(),
        ModelType::default().name(),
    )?;
    Ok(Generated::Written(path.to_path_buf()))
}
