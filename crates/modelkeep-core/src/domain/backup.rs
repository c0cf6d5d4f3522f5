//! Backups of model definitions taken before destructive mutations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The last captured definition of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub model_name: String,
    pub captured_at: DateTime<Utc>,
    pub definition: String,
}

/// Receipt for a completed capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    pub model_name: String,
    pub captured_at: DateTime<Utc>,
    /// Where the durable copy was written.
    pub location: PathBuf,
}

/// A durable copy as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBackup {
    pub definition: String,
    /// Time the copy was written, if the storage can tell.
    pub stored_at: Option<DateTime<Utc>>,
}
