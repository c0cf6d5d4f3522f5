//! Single-generation backups of model definitions.
//!
//! Every capture overwrites the previous one for the same model, both in the
//! in-memory index and in durable storage. Restoring reads the copy but
//! never removes it, so a restore can be repeated.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{Backup, BackupHandle};
use crate::ports::{BackupRepository, BackupStorageError};

/// Errors from backup operations.
#[derive(Debug, Error)]
pub enum BackupError {
    /// No backup exists for the model.
    #[error("No backup found for model '{0}'")]
    NotFound(String),

    /// The durable copy could not be written or read.
    #[error(transparent)]
    Storage(#[from] BackupStorageError),
}

/// Name-keyed backup store.
pub struct BackupStore {
    repo: Arc<dyn BackupRepository>,
    index: RwLock<HashMap<String, Backup>>,
}

impl BackupStore {
    /// Create a store over the given durable storage.
    pub fn new(repo: Arc<dyn BackupRepository>) -> Self {
        Self {
            repo,
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Record `definition` as the backup of `model_name`, replacing any
    /// previous one.
    pub async fn capture(
        &self,
        model_name: &str,
        definition: &str,
    ) -> Result<BackupHandle, BackupError> {
        let location = self.repo.write(model_name, definition).await?;
        let captured_at = Utc::now();

        self.index.write().await.insert(
            model_name.to_string(),
            Backup {
                model_name: model_name.to_string(),
                captured_at,
                definition: definition.to_string(),
            },
        );

        info!(model = %model_name, location = %location.display(), "Captured definition backup");
        Ok(BackupHandle {
            model_name: model_name.to_string(),
            captured_at,
            location,
        })
    }

    /// The backed-up definition text for `model_name`.
    ///
    /// The durable copy is authoritative; the in-memory index is used when the
    /// durable copy has gone missing.
    pub async fn restore(&self, model_name: &str) -> Result<String, BackupError> {
        Ok(self.get(model_name).await?.definition)
    }

    /// The backup for `model_name`, with its capture time.
    pub async fn get(&self, model_name: &str) -> Result<Backup, BackupError> {
        let indexed = self.index.read().await.get(model_name).cloned();

        match self.repo.read(model_name).await? {
            Some(stored) => {
                let captured_at = indexed
                    .as_ref()
                    .filter(|b| b.definition == stored.definition)
                    .map(|b| b.captured_at)
                    .or(stored.stored_at)
                    .unwrap_or_else(Utc::now);
                Ok(Backup {
                    model_name: model_name.to_string(),
                    captured_at,
                    definition: stored.definition,
                })
            }
            None => {
                debug!(model = %model_name, "No durable backup, falling back to index");
                indexed.ok_or_else(|| BackupError::NotFound(model_name.to_string()))
            }
        }
    }

    /// Names of all models with a backup, sorted.
    pub async fn list(&self) -> Result<Vec<String>, BackupError> {
        let mut names: BTreeSet<String> = self.repo.list().await?.into_iter().collect();
        names.extend(self.index.read().await.keys().cloned());
        Ok(names.into_iter().collect())
    }

    /// Delete the backup of `model_name` from the index and from storage.
    pub async fn discard(&self, model_name: &str) -> Result<(), BackupError> {
        self.index.write().await.remove(model_name);
        self.repo.remove(model_name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryBackupRepository;

    fn store() -> (BackupStore, Arc<InMemoryBackupRepository>) {
        let repo = Arc::new(InMemoryBackupRepository::default());
        (BackupStore::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_latest_capture_wins() {
        let (store, _) = store();
        store.capture("foo", "BASE a").await.unwrap();
        store.capture("foo", "BASE b").await.unwrap();

        assert_eq!(store.restore("foo").await.unwrap(), "BASE b");
        assert_eq!(store.list().await.unwrap(), vec!["foo".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_is_repeatable() {
        let (store, _) = store();
        store.capture("foo", "BASE a").await.unwrap();

        assert_eq!(store.restore("foo").await.unwrap(), "BASE a");
        assert_eq!(store.restore("foo").await.unwrap(), "BASE a");
    }

    #[tokio::test]
    async fn test_restore_missing_is_not_found() {
        let (store, _) = store();
        let err = store.restore("nope").await.unwrap_err();
        assert!(matches!(err, BackupError::NotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_durable_copy_survives_new_index() {
        let (store, repo) = store();
        store.capture("foo", "BASE a").await.unwrap();

        // A fresh store over the same storage, as after a restart
        let reopened = BackupStore::new(repo);
        assert_eq!(reopened.restore("foo").await.unwrap(), "BASE a");
        assert_eq!(reopened.list().await.unwrap(), vec!["foo".to_string()]);
    }

    #[tokio::test]
    async fn test_index_used_when_durable_copy_missing() {
        let (store, repo) = store();
        store.capture("foo", "BASE a").await.unwrap();
        repo.remove("foo").await.unwrap();

        assert_eq!(store.restore("foo").await.unwrap(), "BASE a");
    }

    #[tokio::test]
    async fn test_discard_removes_everywhere() {
        let (store, _) = store();
        store.capture("foo", "BASE a").await.unwrap();
        store.discard("foo").await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.restore("foo").await.is_err());
    }
}
