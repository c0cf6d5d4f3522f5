//! Crate-wide error type and its user-facing classification.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::DaemonError;
use crate::services::{
    BackupError, CoordinatorError, IsolationError, MutationError, ValidationError,
};

/// Any error a core service can return.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Isolation(#[from] IsolationError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    /// The daemon is isolated, so the request cannot reach the network.
    #[error("Network isolation is on; disable it to {0}")]
    IsolationActive(String),

    /// Writing an exported definition failed.
    #[error("Failed to write {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    /// Unexpected condition (task panic, broken invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of failures for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Busy,
    Cancelled,
    TransientConnectivity,
    CriticalMutationFailure,
    FirewallInconsistent,
    ExecutableNotFound,
    Internal,
}

impl ErrorKind {
    /// Only failures inside the replace protocol's unsafe window are urgent.
    pub const fn is_urgent(self) -> bool {
        matches!(self, Self::CriticalMutationFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation error",
            Self::NotFound => "not found",
            Self::Busy => "busy",
            Self::Cancelled => "cancelled",
            Self::TransientConnectivity => "daemon unavailable",
            Self::CriticalMutationFailure => "critical failure",
            Self::FirewallInconsistent => "isolation inconsistent",
            Self::ExecutableNotFound => "executable not found",
            Self::Internal => "internal error",
        })
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => validation_kind(e),
            Self::Mutation(e) => match e {
                MutationError::Validation(v) => validation_kind(v),
                MutationError::Connectivity(_) => ErrorKind::TransientConnectivity,
                MutationError::BuildFailed { .. } => ErrorKind::Validation,
                MutationError::BackupFailed {
                    source: BackupError::NotFound(_),
                    ..
                } => ErrorKind::NotFound,
                MutationError::BackupFailed { .. } | MutationError::VerificationFailed { .. } => {
                    ErrorKind::Internal
                }
                MutationError::Critical { .. } => ErrorKind::CriticalMutationFailure,
            },
            Self::Backup(BackupError::NotFound(_)) => ErrorKind::NotFound,
            Self::Backup(BackupError::Storage(_)) | Self::Export { .. } | Self::Internal(_) => {
                ErrorKind::Internal
            }
            Self::Isolation(e) => match e {
                IsolationError::ExecutableNotFound => ErrorKind::ExecutableNotFound,
                IsolationError::Inconsistent { .. } => ErrorKind::FirewallInconsistent,
                IsolationError::Firewall(_) => ErrorKind::Internal,
            },
            Self::Coordinator(CoordinatorError::Busy { .. }) => ErrorKind::Busy,
            Self::Daemon(e) => match e {
                DaemonError::Unreachable(_) => ErrorKind::TransientConnectivity,
                DaemonError::NotFound(_) => ErrorKind::NotFound,
                DaemonError::Rejected(_) => ErrorKind::Validation,
                DaemonError::Status { .. } | DaemonError::InvalidResponse(_) => {
                    ErrorKind::Internal
                }
            },
            Self::IsolationActive(_) => ErrorKind::TransientConnectivity,
        }
    }

    pub fn is_urgent(&self) -> bool {
        self.kind().is_urgent()
    }
}

const fn validation_kind(error: &ValidationError) -> ErrorKind {
    match error {
        ValidationError::Cancelled | ValidationError::BaseModelsUnavailable => {
            ErrorKind::Cancelled
        }
        ValidationError::InvalidDefinition(_) | ValidationError::InvalidModelName(_) => {
            ErrorKind::Validation
        }
    }
}
