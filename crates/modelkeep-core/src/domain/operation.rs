//! Mutating operations and the intent they are run with.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a mutation is being performed.
///
/// The intent selects how strictly the target name and the definition are
/// checked, and whether the previous definition is backed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationIntent {
    /// New model from an edited definition.
    Create,
    /// New model derived from an existing model's definition.
    Clone,
    /// Rebuild an existing model from its edited definition.
    Save,
    /// Rebuild a model from its last backup.
    Restore,
    /// Remove a model from the catalog.
    Delete,
}

/// How the target name of an operation is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// `^[A-Za-z0-9._-]+$`
    New,
    /// `name` or `name:tag`, as listed by the catalog.
    Catalog,
    /// Already validated when the backup was taken.
    Trusted,
}

impl OperationIntent {
    pub const fn name_rule(self) -> NameRule {
        match self {
            Self::Create | Self::Clone => NameRule::New,
            Self::Save | Self::Delete => NameRule::Catalog,
            Self::Restore => NameRule::Trusted,
        }
    }

    /// Whether the definition must pass validation before building.
    pub const fn validates_definition(self) -> bool {
        !matches!(self, Self::Restore | Self::Delete)
    }

    /// Whether an existing definition is backed up before being replaced.
    ///
    /// Restores never capture, so restoring twice yields the same result.
    pub const fn captures_backup(self) -> bool {
        matches!(self, Self::Create | Self::Clone | Self::Save)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Clone => "clone",
            Self::Save => "save",
            Self::Restore => "restore",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation currently admitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub intent: OperationIntent,
    pub target: String,
    pub started_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(intent: OperationIntent, target: impl Into<String>) -> Self {
        Self {
            intent,
            target: target.into(),
            started_at: Utc::now(),
        }
    }
}
