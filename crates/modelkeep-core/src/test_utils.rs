//! In-memory fakes for every port.
//!
//! Available to this crate's unit tests and, through the `test-utils`
//! feature, to downstream crates' tests.
//!
//! [`FakeCatalog`] is the shared model store behind [`FakeDaemon`] and
//! [`FakeBuilder`], so a build through one is visible in listings of the
//! other. Failures are injected per name prefix.

#![allow(clippy::missing_const_for_fn)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::domain::{IsolationRule, ModelDefinition, ModelInfo, ModelSummary, StoredBackup};
use crate::events::AppEvent;
use crate::ports::{
    AppEventEmitter, BackupRepository, BackupStorageError, BaseModelProvider, BuildError,
    DaemonClientPort, DaemonError, ExecutableLocatorPort, FirewallError, FirewallPort,
    ModelBuilderPort,
};

// ============================================================================
// Daemon catalog
// ============================================================================

#[derive(Default)]
struct CatalogState {
    models: BTreeMap<String, String>,
    calls: Vec<String>,
    failing_builds: Vec<String>,
    failing_deletes: Vec<String>,
    failing_copies: bool,
    silent_builds: bool,
    silent_copies: bool,
    unreachable: bool,
    build_gate: Option<Arc<Semaphore>>,
}

impl CatalogState {
    fn find(&self, name: &str) -> Option<String> {
        self.models
            .keys()
            .find(|key| ModelSummary::new(key.as_str()).matches_name(name))
            .cloned()
    }
}

/// Shared model store for [`FakeDaemon`] and [`FakeBuilder`].
#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().expect("fake catalog lock poisoned")
    }

    /// Seed a model.
    pub fn with_model(self, name: &str, definition: &str) -> Self {
        self.lock()
            .models
            .insert(name.to_string(), definition.to_string());
        self
    }

    /// Builds of names starting with `prefix` are rejected.
    pub fn fail_builds_of(self, prefix: &str) -> Self {
        self.lock().failing_builds.push(prefix.to_string());
        self
    }

    /// Deletes of names starting with `prefix` fail with a server error.
    pub fn fail_deletes_of(self, prefix: &str) -> Self {
        self.lock().failing_deletes.push(prefix.to_string());
        self
    }

    /// Every copy is rejected.
    pub fn fail_copies(self) -> Self {
        self.lock().failing_copies = true;
        self
    }

    /// Builds report success without creating anything.
    pub fn drop_builds_silently(self) -> Self {
        self.lock().silent_builds = true;
        self
    }

    /// Copies report success without creating anything.
    pub fn drop_copies_silently(self) -> Self {
        self.lock().silent_copies = true;
        self
    }

    /// Every call fails as if the daemon were not running.
    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// Builds wait for a permit on the returned semaphore.
    pub fn gate_builds(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.lock().build_gate = Some(gate.clone());
        gate
    }

    pub fn daemon(&self) -> FakeDaemon {
        FakeDaemon {
            catalog: self.clone(),
        }
    }

    pub fn builder(&self) -> FakeBuilder {
        FakeBuilder {
            catalog: self.clone(),
        }
    }

    /// Current definition of `name`, resolving the default tag.
    pub fn definition_of(&self, name: &str) -> Option<String> {
        let state = self.lock();
        state.find(name).and_then(|key| state.models.get(&key).cloned())
    }

    /// Catalog keys, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().models.keys().cloned().collect()
    }

    /// Every call made through either port, in order (`"build foo"`, ...).
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn record(&self, call: String) -> Result<(), String> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unreachable {
            Err("connection refused".to_string())
        } else {
            Ok(())
        }
    }
}

/// Fake [`DaemonClientPort`] over a [`FakeCatalog`].
#[derive(Clone)]
pub struct FakeDaemon {
    catalog: FakeCatalog,
}

#[async_trait]
impl DaemonClientPort for FakeDaemon {
    async fn check_connection(&self) -> bool {
        !self.catalog.lock().unreachable
    }

    async fn list_models(&self) -> Result<Vec<ModelSummary>, DaemonError> {
        self.catalog
            .record("list".to_string())
            .map_err(DaemonError::Unreachable)?;
        let state = self.catalog.lock();
        Ok(state
            .models
            .iter()
            .map(|(name, definition)| {
                let mut summary = ModelSummary::new(name.as_str());
                summary.size_bytes = definition.len() as u64;
                summary.modified_at = Some(Utc::now());
                summary
            })
            .collect())
    }

    async fn show_model(&self, name: &str) -> Result<Option<ModelInfo>, DaemonError> {
        self.catalog
            .record(format!("show {name}"))
            .map_err(DaemonError::Unreachable)?;
        let state = self.catalog.lock();
        Ok(state.find(name).map(|key| ModelInfo {
            name: name.to_string(),
            summary: Some(ModelSummary::new(key.as_str())),
            definition: ModelDefinition::new(state.models[&key].as_str()),
            attributes: serde_json::Map::new(),
        }))
    }

    async fn delete_model(&self, name: &str) -> Result<(), DaemonError> {
        self.catalog
            .record(format!("delete {name}"))
            .map_err(DaemonError::Unreachable)?;
        let mut state = self.catalog.lock();
        if state.failing_deletes.iter().any(|p| name.starts_with(p.as_str())) {
            return Err(DaemonError::Status {
                status: 500,
                message: format!("could not delete {name}"),
            });
        }
        let key = state
            .find(name)
            .ok_or_else(|| DaemonError::NotFound(name.to_string()))?;
        state.models.remove(&key);
        Ok(())
    }

    async fn pull_model(
        &self,
        name: &str,
        progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<(), DaemonError> {
        self.catalog
            .record(format!("pull {name}"))
            .map_err(DaemonError::Unreachable)?;
        progress("success");
        Ok(())
    }
}

/// Fake [`ModelBuilderPort`] over a [`FakeCatalog`].
#[derive(Clone)]
pub struct FakeBuilder {
    catalog: FakeCatalog,
}

#[async_trait]
impl ModelBuilderPort for FakeBuilder {
    async fn build(&self, name: &str, definition: &str) -> Result<(), BuildError> {
        self.catalog
            .record(format!("build {name}"))
            .map_err(BuildError::Unavailable)?;

        let gate = self.catalog.lock().build_gate.clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| BuildError::Unavailable(e.to_string()))?;
        }

        let mut state = self.catalog.lock();
        if state.failing_builds.iter().any(|p| name.starts_with(p.as_str())) {
            return Err(BuildError::Rejected {
                name: name.to_string(),
                message: "injected build failure".to_string(),
            });
        }
        if !state.silent_builds {
            state
                .models
                .insert(name.to_string(), definition.to_string());
        }
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), BuildError> {
        self.catalog
            .record(format!("copy {source} {destination}"))
            .map_err(BuildError::Unavailable)?;
        let mut state = self.catalog.lock();
        if state.failing_copies {
            return Err(BuildError::Rejected {
                name: destination.to_string(),
                message: "injected copy failure".to_string(),
            });
        }
        let Some(key) = state.find(source) else {
            return Err(BuildError::Rejected {
                name: source.to_string(),
                message: "source model not found".to_string(),
            });
        };
        if !state.silent_copies {
            let definition = state.models[&key].clone();
            state.models.insert(destination.to_string(), definition);
        }
        Ok(())
    }
}

// ============================================================================
// Backups
// ============================================================================

/// [`BackupRepository`] kept in a map.
#[derive(Default)]
pub struct InMemoryBackupRepository {
    entries: Mutex<HashMap<String, StoredBackup>>,
    failing: bool,
}

impl InMemoryBackupRepository {
    /// A repository whose writes always fail.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            failing: true,
        }
    }

    fn location(model_name: &str) -> PathBuf {
        PathBuf::from(format!("memory/{model_name}_backup.modelfile"))
    }
}

#[async_trait]
impl BackupRepository for InMemoryBackupRepository {
    async fn write(
        &self,
        model_name: &str,
        definition: &str,
    ) -> Result<PathBuf, BackupStorageError> {
        let location = Self::location(model_name);
        if self.failing {
            return Err(BackupStorageError::Io {
                path: location,
                reason: "injected write failure".to_string(),
            });
        }
        self.entries.lock().expect("backup lock poisoned").insert(
            model_name.to_string(),
            StoredBackup {
                definition: definition.to_string(),
                stored_at: Some(Utc::now()),
            },
        );
        Ok(location)
    }

    async fn read(&self, model_name: &str) -> Result<Option<StoredBackup>, BackupStorageError> {
        Ok(self
            .entries
            .lock()
            .expect("backup lock poisoned")
            .get(model_name)
            .cloned())
    }

    async fn remove(&self, model_name: &str) -> Result<(), BackupStorageError> {
        self.entries
            .lock()
            .expect("backup lock poisoned")
            .remove(model_name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, BackupStorageError> {
        Ok(self
            .entries
            .lock()
            .expect("backup lock poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

// ============================================================================
// Firewall and executable lookup
// ============================================================================

/// [`FirewallPort`] backed by a map of rule names.
#[derive(Default)]
pub struct InMemoryFirewall {
    rules: Mutex<BTreeMap<String, IsolationRule>>,
    failing_adds: Mutex<Vec<String>>,
}

impl InMemoryFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rule, bypassing failure injection.
    pub fn with_rule(self, rule: IsolationRule) -> Self {
        self.rules
            .lock()
            .expect("firewall lock poisoned")
            .insert(rule.name.clone(), rule);
        self
    }

    /// Adding the rule called `name` fails.
    pub fn failing_add_of(self, name: &str) -> Self {
        self.failing_adds
            .lock()
            .expect("firewall lock poisoned")
            .push(name.to_string());
        self
    }

    /// Names of the rules currently present.
    pub fn rule_names(&self) -> Vec<String> {
        self.rules
            .lock()
            .expect("firewall lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn rule(&self, name: &str) -> Option<IsolationRule> {
        self.rules
            .lock()
            .expect("firewall lock poisoned")
            .get(name)
            .cloned()
    }
}

impl FirewallPort for InMemoryFirewall {
    fn rule_exists(&self, name: &str) -> Result<bool, FirewallError> {
        Ok(self
            .rules
            .lock()
            .expect("firewall lock poisoned")
            .contains_key(name))
    }

    fn add_rule(&self, rule: &IsolationRule) -> Result<(), FirewallError> {
        let failing = self.failing_adds.lock().expect("firewall lock poisoned");
        if failing.contains(&rule.name) {
            return Err(FirewallError::CommandFailed {
                rule: rule.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        self.rules
            .lock()
            .expect("firewall lock poisoned")
            .insert(rule.name.clone(), rule.clone());
        Ok(())
    }

    fn remove_rule(&self, name: &str) -> Result<(), FirewallError> {
        self.rules
            .lock()
            .expect("firewall lock poisoned")
            .remove(name);
        Ok(())
    }
}

/// [`ExecutableLocatorPort`] with a fixed answer.
#[derive(Debug, Clone)]
pub struct FixedLocator(Option<PathBuf>);

impl FixedLocator {
    pub fn found(path: impl AsRef<Path>) -> Self {
        Self(Some(path.as_ref().to_path_buf()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl ExecutableLocatorPort for FixedLocator {
    fn locate(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

// ============================================================================
// Interaction
// ============================================================================

/// [`BaseModelProvider`] with a scripted model list and answer.
pub struct ScriptedBaseProvider {
    models: Option<Vec<String>>,
    answer: Option<String>,
    choose_calls: AtomicUsize,
    offered: Mutex<Vec<String>>,
}

impl ScriptedBaseProvider {
    fn new(models: Option<Vec<String>>, answer: Option<String>) -> Self {
        Self {
            models,
            answer,
            choose_calls: AtomicUsize::new(0),
            offered: Mutex::default(),
        }
    }

    /// Lists `models`, then picks `answer`.
    pub fn choosing(models: Vec<String>, answer: &str) -> Self {
        Self::new(Some(models), Some(answer.to_string()))
    }

    /// Lists `models`, then declines to choose.
    pub fn declining(models: Vec<String>) -> Self {
        Self::new(Some(models), None)
    }

    /// Cannot list any models.
    pub fn unavailable() -> Self {
        Self::new(None, None)
    }

    pub fn choose_calls(&self) -> usize {
        self.choose_calls.load(Ordering::SeqCst)
    }

    /// Candidates passed to the last `choose` call.
    pub fn offered(&self) -> Vec<String> {
        self.offered.lock().expect("provider lock poisoned").clone()
    }
}

#[async_trait]
impl BaseModelProvider for ScriptedBaseProvider {
    async fn available_models(&self) -> Option<Vec<String>> {
        self.models.clone()
    }

    async fn choose(&self, candidates: &[String]) -> Option<String> {
        self.choose_calls.fetch_add(1, Ordering::SeqCst);
        *self.offered.lock().expect("provider lock poisoned") = candidates.to_vec();
        self.answer.clone()
    }
}

/// [`AppEventEmitter`] that keeps every event.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<AppEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().expect("emitter lock poisoned").clone()
    }
}

impl AppEventEmitter for RecordingEmitter {
    fn emit(&self, event: AppEvent) {
        self.events.lock().expect("emitter lock poisoned").push(event);
    }
}
