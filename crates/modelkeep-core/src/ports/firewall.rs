//! Firewall port for the isolation rule pair.
//!
//! Rule changes are quick OS calls, so the port is synchronous. Backends are
//! platform specific and live in `modelkeep-runtime`.

use thiserror::Error;

use crate::domain::IsolationRule;

/// Errors from firewall backends.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// The rule command ran but failed.
    #[error("Firewall command for rule '{rule}' failed: {message}")]
    CommandFailed { rule: String, message: String },

    /// The process lacks the privileges to change firewall rules.
    #[error("Permission denied changing firewall rules: {0}")]
    PermissionDenied(String),

    /// No firewall backend exists for this platform.
    #[error("Firewall rules are not supported on this platform: {0}")]
    Unsupported(String),
}

/// Port for managing named firewall rules.
#[cfg_attr(test, mockall::automock)]
pub trait FirewallPort: Send + Sync {
    /// Whether a rule with this display name exists.
    fn rule_exists(&self, name: &str) -> Result<bool, FirewallError>;

    /// Create a blocking rule.
    fn add_rule(&self, rule: &IsolationRule) -> Result<(), FirewallError>;

    /// Remove a rule by display name. Absent rules are not an error.
    fn remove_rule(&self, name: &str) -> Result<(), FirewallError>;
}
