//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports and domain logic. They never know
//! which concrete adapters they run against.

mod backup_store;
mod coordinator;
mod isolation;
mod manager;
mod mutator;
mod validator;

pub use backup_store::{BackupError, BackupStore};
pub use coordinator::{
    CoordinatorError, CoordinatorState, DetachNotice, OperationCoordinator, OperationHandle,
};
pub use isolation::{IsolationError, NetworkIsolationController};
pub use manager::{ModelManager, Ports};
pub use mutator::{ModelMutator, MutationError, MutationOutcome, ReplaceStage};
pub use validator::{DefinitionValidator, InvalidReason, ValidationError, ValidationReport};
