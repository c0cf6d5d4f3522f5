//! Filesystem backup repository.
//!
//! One file per model in the backup directory, named by
//! `paths::backup_file_name`. Writes go to a `.tmp` sibling first and are
//! renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelkeep_core::domain::StoredBackup;
use modelkeep_core::paths::{PathError, backup_dir, backup_file_name, model_name_from_backup_file};
use modelkeep_core::{BackupRepository, BackupStorageError};
use tracing::{debug, warn};

/// Backup copies stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FsBackupRepository {
    dir: PathBuf,
}

impl FsBackupRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Repository in the resolved backup directory (override, env, temp).
    pub fn resolved(override_dir: Option<&Path>) -> Result<Self, PathError> {
        backup_dir(override_dir).map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, model_name: &str) -> PathBuf {
        self.dir.join(backup_file_name(model_name))
    }
}

fn io_error(path: &Path, err: &io::Error) -> BackupStorageError {
    BackupStorageError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl BackupRepository for FsBackupRepository {
    async fn write(
        &self,
        model_name: &str,
        definition: &str,
    ) -> Result<PathBuf, BackupStorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))?;

        let path = self.path_for(model_name);
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, definition)
            .await
            .map_err(|e| io_error(&temp, &e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| io_error(&path, &e))?;

        debug!(model = %model_name, path = %path.display(), "Wrote backup file");
        Ok(path)
    }

    async fn read(&self, model_name: &str) -> Result<Option<StoredBackup>, BackupStorageError> {
        let path = self.path_for(model_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e)),
        };
        let definition =
            String::from_utf8(bytes).map_err(|_| BackupStorageError::Encoding(path.clone()))?;

        let stored_at = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .ok();

        Ok(Some(StoredBackup {
            definition,
            stored_at,
        }))
    }

    async fn remove(&self, model_name: &str) -> Result<(), BackupStorageError> {
        let path = self.path_for(model_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, &e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, BackupStorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, &e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, &e))?
        {
            let file_name = entry.file_name();
            match file_name.to_str().and_then(model_name_from_backup_file) {
                Some(name) => names.push(name),
                None => warn!(file = ?file_name, "Ignoring unrelated file in backup directory"),
            }
        }
        names.sort();
        Ok(names)
    }
}
