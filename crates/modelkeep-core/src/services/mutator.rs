//! Create-or-replace of named models.
//!
//! The daemon can only build a model under a name, copy a model, and delete
//! a model. Replacing an existing model therefore goes through a temporary
//! name:
//!
//! 1. If `name` does not exist, build it directly.
//! 2. Otherwise build the new definition as `<name>_temp_<unix seconds>`.
//!    A failure here leaves the original untouched.
//! 3. Delete `name`.
//! 4. Copy the temporary model to `name`.
//! 5. Delete the temporary model (best effort).
//! 6. Check that `name` is listed.
//!
//! Between 3 and 4 the model is missing from the catalog. Failures in that
//! window are reported as [`MutationError::Critical`] and point the user to
//! restore.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{BackupHandle, OperationIntent, catalog_contains, temporary_name};
use crate::events::AppEvent;
use crate::ports::{AppEventEmitter, DaemonClientPort, DaemonError, ModelBuilderPort};

use super::backup_store::{BackupError, BackupStore};
use super::validator::{DefinitionValidator, ValidationError};

/// Step of the replace protocol where a critical failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStage {
    DeleteOriginal,
    CopyTemporary,
    Verify,
}

impl fmt::Display for ReplaceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DeleteOriginal => "deleting the original model",
            Self::CopyTemporary => "renaming the rebuilt model",
            Self::Verify => "verifying the rebuilt model",
        })
    }
}

/// Errors from `ModelMutator::create_or_replace`.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Name or definition rejected before any daemon call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The daemon could not be reached. Nothing was changed.
    #[error("Daemon unavailable: {0}")]
    Connectivity(String),

    /// Building the definition failed. Any existing model is untouched.
    #[error("Building model '{name}' failed: {reason}")]
    BuildFailed { name: String, reason: String },

    /// The previous definition could not be backed up. Nothing was changed.
    #[error("Could not back up model '{name}': {source}")]
    BackupFailed {
        name: String,
        #[source]
        source: BackupError,
    },

    /// The daemon reported success but the model is not in the catalog.
    #[error("Model '{name}' was not found in the catalog after it was created")]
    VerificationFailed { name: String },

    /// Failure after the original model was deleted.
    #[error(
        "Model '{name}' may be lost: {stage} failed ({reason}). Use restore to recover it{}",
        rebuilt_copy_hint(.temp_name)
    )]
    Critical {
        name: String,
        stage: ReplaceStage,
        reason: String,
        /// Temporary model still holding the new definition, if any.
        temp_name: Option<String>,
    },
}

impl MutationError {
    /// True for failures inside the unsafe window.
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Critical { .. })
    }
}

/// Result of a successful `create_or_replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub name: String,
    /// True if an existing model was replaced.
    pub replaced: bool,
    /// Backup taken before the replace, if any.
    pub backup: Option<BackupHandle>,
    /// Temporary model whose cleanup failed and is still in the catalog.
    pub leaked_temp: Option<String>,
}

/// Orchestrates create/replace against the daemon.
pub struct ModelMutator {
    daemon: Arc<dyn DaemonClientPort>,
    builder: Arc<dyn ModelBuilderPort>,
    backups: Arc<BackupStore>,
}

impl ModelMutator {
    pub fn new(
        daemon: Arc<dyn DaemonClientPort>,
        builder: Arc<dyn ModelBuilderPort>,
        backups: Arc<BackupStore>,
    ) -> Self {
        Self {
            daemon,
            builder,
            backups,
        }
    }

    /// Checks that need no daemon call: the name rule of `intent` and, unless
    /// the intent trusts its input, definition validity.
    pub fn preflight(
        name: &str,
        definition: &str,
        intent: OperationIntent,
    ) -> Result<(), ValidationError> {
        DefinitionValidator::check_name(name, intent.name_rule())?;
        if intent.validates_definition() {
            DefinitionValidator::require_valid(definition)?;
        }
        Ok(())
    }

    /// Create `name` from `definition`, or replace it if it already exists.
    pub async fn create_or_replace(
        &self,
        name: &str,
        definition: &str,
        intent: OperationIntent,
        events: &dyn AppEventEmitter,
    ) -> Result<MutationOutcome, MutationError> {
        Self::preflight(name, definition, intent)?;

        let progress = |message: String| events.emit(AppEvent::progress(intent, name, message));

        progress(format!("Checking whether {name} exists"));
        let models = self.daemon.list_models().await.map_err(connectivity)?;

        if !catalog_contains(&models, name) {
            progress(format!("Creating model {name}"));
            self.builder
                .build(name, definition)
                .await
                .map_err(|e| MutationError::BuildFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;

            progress(format!("Verifying model {name}"));
            if !self.is_listed(name).await {
                warn!(model = %name, "Build reported success but model is not listed");
                return Err(MutationError::VerificationFailed {
                    name: name.to_string(),
                });
            }

            info!(model = %name, %intent, "Created model");
            return Ok(MutationOutcome {
                name: name.to_string(),
                replaced: false,
                backup: None,
                leaked_temp: None,
            });
        }

        let backup = if intent.captures_backup() {
            progress(format!("Backing up the definition of {name}"));
            let handle = self.capture_backup(name).await?;
            events.emit(AppEvent::BackupCaptured {
                model: name.to_string(),
                location: handle.location.display().to_string(),
            });
            Some(handle)
        } else {
            None
        };

        let temp = temporary_name(name, Utc::now().timestamp());
        progress(format!("Building replacement as {temp}"));
        self.builder
            .build(&temp, definition)
            .await
            .map_err(|e| MutationError::BuildFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        // Unsafe window: the original is gone until the copy lands.
        progress(format!("Removing previous version of {name}"));
        if let Err(e) = self.daemon.delete_model(name).await {
            error!(model = %name, temp = %temp, error = %e, "Deleting original failed during replace");
            return Err(critical(name, ReplaceStage::DeleteOriginal, &e, Some(&temp)));
        }

        progress(format!("Renaming {temp} to {name}"));
        if let Err(e) = self.builder.copy(&temp, name).await {
            error!(model = %name, temp = %temp, error = %e, "Copying replacement failed after original was deleted");
            return Err(critical(name, ReplaceStage::CopyTemporary, &e, Some(&temp)));
        }

        progress(format!("Cleaning up {temp}"));
        let leaked_temp = match self.daemon.delete_model(&temp).await {
            Ok(()) => None,
            Err(e) => {
                warn!(temp = %temp, error = %e, "Failed to delete temporary model");
                Some(temp)
            }
        };

        progress(format!("Verifying model {name}"));
        if !self.is_listed(name).await {
            error!(model = %name, "Replaced model is not listed");
            return Err(MutationError::Critical {
                name: name.to_string(),
                stage: ReplaceStage::Verify,
                reason: "the model is missing from the catalog".to_string(),
                temp_name: leaked_temp,
            });
        }

        info!(model = %name, %intent, "Replaced model");
        Ok(MutationOutcome {
            name: name.to_string(),
            replaced: true,
            backup,
            leaked_temp,
        })
    }

    async fn capture_backup(&self, name: &str) -> Result<BackupHandle, MutationError> {
        let backup_failed = |source| MutationError::BackupFailed {
            name: name.to_string(),
            source,
        };

        let current = match self.daemon.show_model(name).await {
            Ok(Some(info)) => info.definition.into_string(),
            Ok(None) => {
                debug!(model = %name, "Model vanished before backup");
                return Err(backup_failed(BackupError::NotFound(name.to_string())));
            }
            Err(e) => return Err(connectivity(e)),
        };

        self.backups
            .capture(name, &current)
            .await
            .map_err(backup_failed)
    }

    async fn is_listed(&self, name: &str) -> bool {
        match self.daemon.list_models().await {
            Ok(models) => catalog_contains(&models, name),
            Err(e) => {
                warn!(model = %name, error = %e, "Could not list models for verification");
                false
            }
        }
    }
}

fn rebuilt_copy_hint(temp_name: &Option<String>) -> String {
    temp_name
        .as_deref()
        .map(|t| format!(" (the new definition is still available as '{t}')"))
        .unwrap_or_default()
}

fn connectivity(err: DaemonError) -> MutationError {
    MutationError::Connectivity(err.to_string())
}

fn critical(
    name: &str,
    stage: ReplaceStage,
    err: &dyn std::error::Error,
    temp: Option<&str>,
) -> MutationError {
    MutationError::Critical {
        name: name.to_string(),
        stage,
        reason: err.to_string(),
        temp_name: temp.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoopEmitter;
    use crate::test_utils::{FakeCatalog, InMemoryBackupRepository, RecordingEmitter};

    const ORIGINAL: &str = "BASE llama2\nSYSTEM original";
    const UPDATED: &str = "BASE llama2\nSYSTEM updated";

    fn mutator(catalog: &FakeCatalog) -> (ModelMutator, Arc<BackupStore>) {
        let backups = Arc::new(BackupStore::new(Arc::new(
            InMemoryBackupRepository::default(),
        )));
        let mutator = ModelMutator::new(
            Arc::new(catalog.daemon()),
            Arc::new(catalog.builder()),
            backups.clone(),
        );
        (mutator, backups)
    }

    #[tokio::test]
    async fn test_creates_missing_model_directly() {
        let catalog = FakeCatalog::new();
        let (mutator, _) = mutator(&catalog);

        let outcome = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Create, &NoopEmitter)
            .await
            .unwrap();

        assert!(!outcome.replaced);
        assert_eq!(catalog.definition_of("foo").as_deref(), Some(UPDATED));
        assert!(!catalog.calls().iter().any(|c| c.contains("_temp_")));
    }

    #[tokio::test]
    async fn test_replaces_existing_model_through_temporary_name() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL);
        let (mutator, backups) = mutator(&catalog);

        let outcome = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap();

        assert!(outcome.replaced);
        assert!(outcome.leaked_temp.is_none());
        assert_eq!(catalog.definition_of("foo").as_deref(), Some(UPDATED));
        assert_eq!(catalog.names(), vec!["foo".to_string()]);
        assert_eq!(backups.restore("foo").await.unwrap(), ORIGINAL);

        let calls = catalog.calls();
        let build = calls.iter().position(|c| c.starts_with("build foo_temp_")).unwrap();
        let delete = calls.iter().position(|c| c == "delete foo").unwrap();
        let copy = calls.iter().position(|c| c.starts_with("copy foo_temp_")).unwrap();
        assert!(build < delete && delete < copy);
    }

    #[tokio::test]
    async fn test_failed_temporary_build_leaves_original_untouched() {
        let catalog = FakeCatalog::new()
            .with_model("foo", ORIGINAL)
            .fail_builds_of("foo_temp_");
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::BuildFailed { .. }));
        assert!(!err.is_critical());
        assert_eq!(catalog.definition_of("foo").as_deref(), Some(ORIGINAL));
        assert!(!catalog.calls().contains(&"delete foo".to_string()));
    }

    #[tokio::test]
    async fn test_copy_failure_after_delete_is_critical() {
        let catalog = FakeCatalog::new()
            .with_model("foo", ORIGINAL)
            .fail_copies();
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        match err {
            MutationError::Critical {
                stage, temp_name, ..
            } => {
                assert_eq!(stage, ReplaceStage::CopyTemporary);
                assert!(temp_name.unwrap().starts_with("foo_temp_"));
            }
            other => panic!("expected critical failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_failure_is_critical() {
        let catalog = FakeCatalog::new()
            .with_model("foo", ORIGINAL)
            .fail_deletes_of("foo");
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Critical {
                stage: ReplaceStage::DeleteOriginal,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_temp_cleanup_is_reported_not_escalated() {
        let catalog = FakeCatalog::new()
            .with_model("foo", ORIGINAL)
            .fail_deletes_of("foo_temp_");
        let (mutator, _) = mutator(&catalog);

        let outcome = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap();

        assert_eq!(catalog.definition_of("foo").as_deref(), Some(UPDATED));
        let leaked = outcome.leaked_temp.unwrap();
        assert!(catalog.names().contains(&leaked));
    }

    #[tokio::test]
    async fn test_silent_daemon_failure_is_caught_by_verification() {
        let catalog = FakeCatalog::new().drop_builds_silently();
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Create, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::VerificationFailed { .. }));
    }

    #[tokio::test]
    async fn test_silent_copy_failure_on_replace_is_critical() {
        let catalog = FakeCatalog::new()
            .with_model("foo", ORIGINAL)
            .drop_copies_silently();
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Critical {
                stage: ReplaceStage::Verify,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_bad_name_rejected_before_daemon_call() {
        let catalog = FakeCatalog::new();
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("bad name!", UPDATED, OperationIntent::Create, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Validation(ValidationError::InvalidModelName(_))
        ));
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_definition_rejected_unless_restoring() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL);
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", "SYSTEM no base", OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Validation(_)));
        assert!(catalog.calls().is_empty());

        mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Restore, &NoopEmitter)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_restore_does_not_capture_backup() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL);
        let (mutator, backups) = mutator(&catalog);

        let outcome = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Restore, &NoopEmitter)
            .await
            .unwrap();

        assert!(outcome.backup.is_none());
        assert!(backups.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_before_any_change() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL);
        let backups = Arc::new(BackupStore::new(Arc::new(
            InMemoryBackupRepository::failing(),
        )));
        let mutator = ModelMutator::new(
            Arc::new(catalog.daemon()),
            Arc::new(catalog.builder()),
            backups,
        );

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::BackupFailed { .. }));
        assert!(!catalog.calls().iter().any(|c| c.starts_with("build")));
        assert_eq!(catalog.definition_of("foo").as_deref(), Some(ORIGINAL));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_changes_nothing() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL).unreachable();
        let (mutator, _) = mutator(&catalog);

        let err = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &NoopEmitter)
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::Connectivity(_)));
        assert_eq!(catalog.definition_of("foo").as_deref(), Some(ORIGINAL));
    }

    #[tokio::test]
    async fn test_replace_matches_untagged_name_to_latest() {
        let catalog = FakeCatalog::new().with_model("foo:latest", ORIGINAL);
        let (mutator, _) = mutator(&catalog);

        let outcome = mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Create, &NoopEmitter)
            .await
            .unwrap();

        assert!(outcome.replaced);
        assert!(outcome.backup.is_some());
    }

    #[tokio::test]
    async fn test_progress_is_reported() {
        let catalog = FakeCatalog::new().with_model("foo", ORIGINAL);
        let (mutator, _) = mutator(&catalog);
        let events = RecordingEmitter::default();

        mutator
            .create_or_replace("foo", UPDATED, OperationIntent::Save, &events)
            .await
            .unwrap();

        let recorded = events.events();
        assert!(recorded.iter().filter(|e| e.is_progress()).count() >= 5);
        assert!(
            recorded
                .iter()
                .any(|e| matches!(e, AppEvent::BackupCaptured { model, .. } if model == "foo"))
        );
    }
}
