//! `ModelManager` - the primary application facade.
//!
//! This is the composition root for core services. Front ends receive a
//! `ModelManager` built from concrete adapters and use it for every model,
//! backup and isolation operation.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{IsolationState, ModelInfo, ModelSummary, OperationIntent};
use crate::error::CoreError;
use crate::events::AppEvent;
use crate::ports::{
    AppEventEmitter, BackupRepository, BaseModelProvider, DaemonClientPort, DaemonError,
    ExecutableLocatorPort, FirewallPort, ModelBuilderPort,
};

use super::{
    BackupStore, DefinitionValidator, ModelMutator, MutationOutcome, NetworkIsolationController,
    OperationCoordinator, OperationHandle,
};

/// Adapters the manager is built from.
pub struct Ports {
    pub daemon: Arc<dyn DaemonClientPort>,
    pub builder: Arc<dyn ModelBuilderPort>,
    pub backups: Arc<dyn BackupRepository>,
    pub firewall: Arc<dyn FirewallPort>,
    pub locator: Arc<dyn ExecutableLocatorPort>,
}

/// The core application facade.
///
/// # Example
///
/// ```ignore
/// let manager = ModelManager::new(ports, Arc::new(NoopEmitter::new()));
///
/// let handle = manager
///     .submit_definition("assistant", &text, OperationIntent::Create, &provider)
///     .await?;
/// let outcome = handle.wait().await?;
/// ```
pub struct ModelManager {
    daemon: Arc<dyn DaemonClientPort>,
    backups: Arc<BackupStore>,
    mutator: Arc<ModelMutator>,
    isolation: Arc<NetworkIsolationController>,
    coordinator: OperationCoordinator,
    events: Arc<dyn AppEventEmitter>,
}

impl ModelManager {
    pub fn new(ports: Ports, events: Arc<dyn AppEventEmitter>) -> Self {
        let backups = Arc::new(BackupStore::new(ports.backups));
        let mutator = Arc::new(ModelMutator::new(
            ports.daemon.clone(),
            ports.builder,
            backups.clone(),
        ));
        Self {
            daemon: ports.daemon,
            backups,
            mutator,
            isolation: Arc::new(NetworkIsolationController::new(
                ports.firewall,
                ports.locator,
            )),
            coordinator: OperationCoordinator::new(events.clone()),
            events,
        }
    }

    pub const fn backups(&self) -> &Arc<BackupStore> {
        &self.backups
    }

    pub fn isolation(&self) -> &NetworkIsolationController {
        &self.isolation
    }

    pub const fn coordinator(&self) -> &OperationCoordinator {
        &self.coordinator
    }

    // ========== Catalog ==========

    pub async fn check_connection(&self) -> bool {
        self.daemon.check_connection().await
    }

    /// All catalog entries. Leftover temporary models are logged.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>, CoreError> {
        let models = self.daemon.list_models().await?;
        for leftover in models.iter().filter(|m| m.is_temporary()) {
            warn!(model = %leftover.name, "Catalog contains a leftover temporary model");
        }
        Ok(models)
    }

    pub async fn show_model(&self, name: &str) -> Result<ModelInfo, CoreError> {
        self.daemon
            .show_model(name)
            .await?
            .ok_or_else(|| DaemonError::NotFound(name.to_string()).into())
    }

    /// Definition of `source`, to be edited and created under a new name
    /// with [`OperationIntent::Clone`].
    pub async fn clone_definition(&self, source: &str) -> Result<String, CoreError> {
        Ok(self.show_model(source).await?.definition.into_string())
    }

    /// Write the definition of `name` to `path` as UTF-8.
    pub async fn export_definition(&self, name: &str, path: &Path) -> Result<(), CoreError> {
        let info = self.show_model(name).await?;
        tokio::fs::write(path, info.definition.as_str())
            .await
            .map_err(|e| CoreError::Export {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        info!(model = %name, path = %path.display(), "Exported definition");
        Ok(())
    }

    /// Download `name` through the daemon, reporting its status lines as
    /// [`AppEvent::PullProgress`]. Refused while isolation is on.
    pub async fn pull_model(&self, name: &str) -> Result<(), CoreError> {
        // Firewall queries spawn processes; keep them off the async workers.
        let isolation = self.isolation.clone();
        let state = tokio::task::spawn_blocking(move || isolation.current_state())
            .await
            .map_err(|e| CoreError::Internal(format!("isolation check failed: {e}")))?;
        if matches!(state, Ok(IsolationState::On)) {
            return Err(CoreError::IsolationActive("pull models".to_string()));
        }

        let events = self.events.clone();
        let model = name.to_string();
        let progress = move |status: &str| {
            events.emit(AppEvent::PullProgress {
                model: model.clone(),
                status: status.to_string(),
            });
        };
        self.daemon.pull_model(name, &progress).await?;
        info!(model = %name, "Pulled model");
        Ok(())
    }

    // ========== Mutations ==========

    /// Repair the base directive if needed, then start a create-or-replace.
    ///
    /// The name is checked before the user is asked for a base model.
    pub async fn submit_definition(
        &self,
        name: &str,
        definition: &str,
        intent: OperationIntent,
        provider: &dyn BaseModelProvider,
    ) -> Result<OperationHandle<MutationOutcome>, CoreError> {
        DefinitionValidator::check_name(name, intent.name_rule())?;
        let definition = if intent.validates_definition() {
            DefinitionValidator::ensure_valid_base(definition, provider).await?
        } else {
            definition.to_string()
        };
        self.coordinator
            .submit_mutation(self.mutator.clone(), name, &definition, intent)
    }

    /// Rebuild `name` from its last backup.
    pub async fn restore_model(
        &self,
        name: &str,
    ) -> Result<OperationHandle<MutationOutcome>, CoreError> {
        let definition = self.backups.restore(name).await?;
        self.coordinator.submit_mutation(
            self.mutator.clone(),
            name,
            &definition,
            OperationIntent::Restore,
        )
    }

    /// Remove `name` from the catalog.
    pub fn delete_model(&self, name: &str) -> Result<OperationHandle<()>, CoreError> {
        DefinitionValidator::check_name(name, OperationIntent::Delete.name_rule())?;

        let daemon = self.daemon.clone();
        let model = name.to_string();
        self.coordinator
            .spawn(OperationIntent::Delete, name, move |events| async move {
                events.emit(AppEvent::progress(
                    OperationIntent::Delete,
                    &model,
                    format!("Deleting {model}"),
                ));
                daemon.delete_model(&model).await?;
                info!(model = %model, "Deleted model");
                events.emit(AppEvent::model_removed(model));
                Ok(())
            })
    }

    pub async fn list_backups(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.backups.list().await?)
    }

    // ========== Isolation ==========

    pub fn isolation_state(&self) -> Result<IsolationState, CoreError> {
        Ok(self.isolation.current_state()?)
    }

    pub fn enable_isolation(&self) -> Result<IsolationState, CoreError> {
        let result = self.isolation.enable_located();
        self.report_isolation();
        Ok(result?)
    }

    pub fn disable_isolation(&self) -> Result<IsolationState, CoreError> {
        let result = self.isolation.disable();
        self.report_isolation();
        Ok(result?)
    }

    fn report_isolation(&self) {
        if let Ok(state) = self.isolation.current_state() {
            self.events.emit(AppEvent::IsolationChanged { state });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{
        FakeCatalog, FixedLocator, InMemoryBackupRepository, InMemoryFirewall,
        RecordingEmitter, ScriptedBaseProvider,
    };

    struct Harness {
        manager: ModelManager,
        catalog: FakeCatalog,
        events: Arc<RecordingEmitter>,
    }

    fn harness(catalog: FakeCatalog) -> Harness {
        let events = Arc::new(RecordingEmitter::default());
        let ports = Ports {
            daemon: Arc::new(catalog.daemon()),
            builder: Arc::new(catalog.builder()),
            backups: Arc::new(InMemoryBackupRepository::default()),
            firewall: Arc::new(InMemoryFirewall::new()),
            locator: Arc::new(FixedLocator::found("/usr/local/bin/daemon")),
        };
        Harness {
            manager: ModelManager::new(ports, events.clone()),
            catalog,
            events,
        }
    }

    fn provider() -> ScriptedBaseProvider {
        ScriptedBaseProvider::choosing(vec!["llama2".into(), "mistral".into()], "mistral")
    }

    #[tokio::test]
    async fn test_create_repairs_missing_base() {
        let h = harness(FakeCatalog::new().with_model("mistral:latest", "BASE x"));

        let handle = h
            .manager
            .submit_definition(
                "assistant",
                "PARAMETER temperature 0.7",
                OperationIntent::Create,
                &provider(),
            )
            .await
            .unwrap();
        handle.wait().await.unwrap();

        assert_eq!(
            h.catalog.definition_of("assistant").as_deref(),
            Some("BASE mistral\nPARAMETER temperature 0.7")
        );
    }

    #[tokio::test]
    async fn test_save_then_restore_roundtrip() {
        let h = harness(FakeCatalog::new().with_model("foo:latest", "BASE llama2\nSYSTEM v1"));

        h.manager
            .submit_definition(
                "foo:latest",
                "BASE llama2\nSYSTEM v2",
                OperationIntent::Save,
                &provider(),
            )
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(
            h.catalog.definition_of("foo").as_deref(),
            Some("BASE llama2\nSYSTEM v2")
        );

        for _ in 0..2 {
            h.manager
                .restore_model("foo:latest")
                .await
                .unwrap()
                .wait()
                .await
                .unwrap();
            assert_eq!(
                h.catalog.definition_of("foo").as_deref(),
                Some("BASE llama2\nSYSTEM v1")
            );
        }

        let info = h.manager.show_model("foo").await.unwrap();
        assert!(DefinitionValidator::validate(info.definition.as_str()).valid);
    }

    #[tokio::test]
    async fn test_restore_without_backup_is_not_found() {
        let h = harness(FakeCatalog::new());
        let err = h.manager.restore_model("foo").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_declined_repair_aborts_without_daemon_call() {
        let h = harness(FakeCatalog::new());
        let declining = ScriptedBaseProvider::declining(vec!["llama2".into()]);

        let err = h
            .manager
            .submit_definition("foo", "SYSTEM hi", OperationIntent::Create, &declining)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(h.catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_emits_removal() {
        let h = harness(FakeCatalog::new().with_model("foo:latest", "BASE llama2"));

        h.manager.delete_model("foo:latest").unwrap().wait().await.unwrap();

        assert!(h.catalog.names().is_empty());
        assert!(
            h.events
                .events()
                .contains(&AppEvent::model_removed("foo:latest"))
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let h = harness(FakeCatalog::new());
        let err = h.manager.delete_model("ghost").unwrap().wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_pull_refused_while_isolated() {
        let h = harness(FakeCatalog::new());
        h.manager.enable_isolation().unwrap();

        let err = h.manager.pull_model("llama2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientConnectivity);
        assert!(h.catalog.calls().is_empty());

        h.manager.disable_isolation().unwrap();
        h.manager.pull_model("llama2").await.unwrap();
        assert_eq!(h.catalog.calls(), vec!["pull llama2".to_string()]);
        assert!(h.events.events().contains(&AppEvent::PullProgress {
            model: "llama2".to_string(),
            status: "success".to_string(),
        }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_pull_checks_firewall_off_the_async_thread() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let answered = Arc::new(AtomicBool::new(false));
        let seen = answered.clone();
        let mut firewall = crate::ports::MockFirewallPort::new();
        firewall.expect_rule_exists().returning(move |_| {
            // Only answered if the runtime thread is free to run the sender.
            if rx.recv_timeout(Duration::from_secs(2)).is_ok() {
                seen.store(true, Ordering::SeqCst);
            }
            Ok(false)
        });

        let catalog = FakeCatalog::new();
        let ports = Ports {
            daemon: Arc::new(catalog.daemon()),
            builder: Arc::new(catalog.builder()),
            backups: Arc::new(InMemoryBackupRepository::default()),
            firewall: Arc::new(firewall),
            locator: Arc::new(FixedLocator::missing()),
        };
        let manager = ModelManager::new(ports, Arc::new(RecordingEmitter::default()));

        tokio::spawn(async move {
            let _ = tx.send(());
            let _ = tx.send(());
        });
        manager.pull_model("llama2").await.unwrap();

        assert!(answered.load(Ordering::SeqCst));
        assert_eq!(catalog.calls(), vec!["pull llama2".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_transient() {
        let h = harness(FakeCatalog::new().unreachable());
        assert!(!h.manager.check_connection().await);
        let err = h.manager.list_models().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientConnectivity);
    }

    #[tokio::test]
    async fn test_clone_and_export_definition() {
        let h = harness(FakeCatalog::new().with_model("base:latest", "BASE llama2\nSYSTEM s"));
        let text = h.manager.clone_definition("base").await.unwrap();
        assert_eq!(text, "BASE llama2\nSYSTEM s");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.modelfile");
        h.manager.export_definition("base", &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }
}
