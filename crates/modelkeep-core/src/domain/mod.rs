//! Domain types shared by all services and adapters.

mod backup;
mod definition;
mod isolation;
mod model;
mod operation;

pub use backup::{Backup, BackupHandle, StoredBackup};
pub use definition::{
    BASE_KEYWORD, DAEMON_BASE_KEYWORD, Directive, ModelDefinition, base_argument,
    is_valid_base_reference, normalize_text,
};
pub use isolation::{
    INBOUND_RULE_NAME, IsolationRule, IsolationState, OUTBOUND_RULE_NAME, RuleDirection,
};
pub use model::{
    DEFAULT_TAG, ModelInfo, ModelSummary, catalog_contains, is_valid_catalog_name,
    is_valid_model_name, temporary_name,
};
pub use operation::{NameRule, OperationIntent, PendingOperation};
