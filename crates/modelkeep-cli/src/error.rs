//! CLI error type and exit codes.
//!
//! Core failures are classified by `ErrorKind`; a critical mutation failure
//! gets its own exit code so scripts can tell that a model may be gone.

use modelkeep_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Exit code for a failure inside the replace window.
pub const EXIT_CRITICAL: i32 = 3;

#[derive(Debug, Error)]
pub enum CliError {
    /// Core failure with its classification.
    #[error("{message}")]
    Core { kind: ErrorKind, message: String },

    /// Invalid arguments or input.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// I/O error (definition file unreadable, stdin closed, ...).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Starting the daemon failed.
    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core { kind, .. } => match kind {
                ErrorKind::CriticalMutationFailure => EXIT_CRITICAL,
                ErrorKind::Validation => 65,                 // EX_DATAERR
                ErrorKind::NotFound => 66,                   // EX_NOINPUT
                ErrorKind::TransientConnectivity => 69,      // EX_UNAVAILABLE
                ErrorKind::Busy => 75,                       // EX_TEMPFAIL
                ErrorKind::FirewallInconsistent => 76,       // EX_PROTOCOL
                ErrorKind::ExecutableNotFound => 72,         // EX_OSFILE
                ErrorKind::Cancelled => 130,
                ErrorKind::Internal => 70,                   // EX_SOFTWARE
            },
            Self::Arguments(_) => 2,
            Self::Io(_) => 74,     // EX_IOERR
            Self::Config(_) => 78, // EX_CONFIG
            Self::Process(_) => 71, // EX_OSERR
        }
    }

    pub const fn is_urgent(&self) -> bool {
        matches!(self, Self::Core { kind, .. } if kind.is_urgent())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::Core {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Io(format!("{err:#}"))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelkeep_core::{DaemonError, MutationError, ReplaceStage};

    #[test]
    fn test_critical_failure_has_own_exit_code() {
        let err = CliError::from(CoreError::from(MutationError::Critical {
            name: "foo".into(),
            stage: ReplaceStage::CopyTemporary,
            reason: "copy refused".into(),
            temp_name: Some("foo_temp_1700000000".into()),
        }));
        assert_eq!(err.exit_code(), EXIT_CRITICAL);
        assert!(err.is_urgent());
    }

    #[test]
    fn test_unreachable_daemon_is_unavailable() {
        let err = CliError::from(CoreError::from(DaemonError::Unreachable("refused".into())));
        assert_eq!(err.exit_code(), 69);
        assert!(!err.is_urgent());
    }
}
