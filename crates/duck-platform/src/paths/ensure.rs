use std::fs;

use duck_common::StorageError;

use super::resolve::{config_dir, history_dir};

/// Creates the duck-chat directories if they do not already exist.
pub fn ensure_dirs() -> Result<(), StorageError> {
    fs::create_dir_all(config_dir()?).map_err(|e| StorageError::PathError(e.to_string()))?;
    fs::create_dir_all(history_dir()?).map_err(|e| StorageError::PathError(e.to_string()))?;
    Ok(())
}
