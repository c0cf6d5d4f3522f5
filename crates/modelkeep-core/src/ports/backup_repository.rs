//! Durable storage for definition backups.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::StoredBackup;

/// Errors from backup storage.
#[derive(Debug, Error)]
pub enum BackupStorageError {
    /// Reading or writing the durable copy failed.
    #[error("Backup storage error at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// The durable copy is not valid UTF-8.
    #[error("Backup at {0} is not valid UTF-8")]
    Encoding(PathBuf),
}

/// Single-generation, name-keyed storage: writing a name replaces its copy.
#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Write `definition` as the copy for `model_name`, returning its location.
    async fn write(&self, model_name: &str, definition: &str)
    -> Result<PathBuf, BackupStorageError>;

    /// Read the copy for `model_name`, if any.
    async fn read(&self, model_name: &str) -> Result<Option<StoredBackup>, BackupStorageError>;

    /// Delete the copy for `model_name`. Absent copies are not an error.
    async fn remove(&self, model_name: &str) -> Result<(), BackupStorageError>;

    /// Names with a stored copy.
    async fn list(&self) -> Result<Vec<String>, BackupStorageError>;
}
