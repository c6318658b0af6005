//! Named conversation history files.
//!
//! Each saved conversation is a flat JSON document inside the history
//! directory. The store is agnostic of the record shape; callers pass any
//! serde type.

use std::fs;
use std::path::{Path, PathBuf};

use duck_common::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::paths::history_dir;

const EXTENSION: &str = "json";

/// Reads and writes named history files in one directory.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform history directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(history_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a user-supplied name to a file path inside the store.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.dir.join(file_name(name)?))
    }

    /// Write `record` under `name`, creating the directory if needed.
    pub fn save<T: Serialize>(&self, name: &str, record: &T) -> Result<PathBuf, StorageError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            StorageError::PathError(format!(
                "failed to create history directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        info!("saved history to {}", path.display());
        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, StorageError> {
        let path = self.path_for(name)?;
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(file_name(name)?));
            }
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_str(&data)?;
        debug!("loaded history from {}", path.display());
        Ok(record)
    }

    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted history {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(file_name(name)?))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of saved histories, sorted. A missing directory is an empty store.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Validate a history name and give it the `.json` extension.
fn file_name(name: &str) -> Result<String, StorageError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
        || trimmed.chars().any(char::is_control);
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }

    if Path::new(trimmed).extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}.{EXTENSION}"))
    }
}
