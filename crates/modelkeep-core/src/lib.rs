#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use domain::{
    Backup, BackupHandle, Directive, IsolationRule, IsolationState, ModelDefinition, ModelInfo,
    ModelSummary, OperationIntent, PendingOperation, RuleDirection,
};
pub use error::{CoreError, ErrorKind};
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, BackupRepository, BackupStorageError, BaseModelProvider, BuildError,
    ChannelEmitter, DaemonClientPort, DaemonError, ExecutableLocatorPort, FirewallError,
    FirewallPort, ModelBuilderPort, NoopEmitter,
};
pub use services::{
    BackupError, BackupStore, CoordinatorError, CoordinatorState, DefinitionValidator,
    DetachNotice, InvalidReason, IsolationError, ModelManager, ModelMutator, MutationError,
    MutationOutcome, NetworkIsolationController, OperationCoordinator, OperationHandle, Ports,
    ReplaceStage, ValidationError, ValidationReport,
};
pub use settings::{BuildBackend, DEFAULT_DAEMON_URL, Settings, SettingsError, validate_settings};
