//! Network isolation of the daemon.
//!
//! Isolation is a pair of blocking firewall rules (outbound and inbound)
//! bound to the daemon executable. It is on only when both rules exist.
//! A half-applied pair is reported as inconsistent and left in place so the
//! caller can retry `enable` or clear it with `disable`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{INBOUND_RULE_NAME, IsolationRule, IsolationState, OUTBOUND_RULE_NAME};
use crate::ports::{ExecutableLocatorPort, FirewallError, FirewallPort};

/// Errors from isolation changes.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// The daemon executable could not be located. No rule was touched.
    #[error("Daemon executable not found; isolation needs its path")]
    ExecutableNotFound,

    /// Only one rule of the pair exists after a failed change.
    #[error("Isolation is only partially applied ({source}). Retry, or disable to clear it")]
    Inconsistent {
        #[source]
        source: FirewallError,
    },

    /// The firewall refused the change and the rule pair is unchanged.
    #[error(transparent)]
    Firewall(#[from] FirewallError),
}

/// Manages the isolation rule pair.
pub struct NetworkIsolationController {
    firewall: Arc<dyn FirewallPort>,
    locator: Arc<dyn ExecutableLocatorPort>,
    // Serializes isolation changes.
    lock: Mutex<()>,
}

impl NetworkIsolationController {
    pub fn new(firewall: Arc<dyn FirewallPort>, locator: Arc<dyn ExecutableLocatorPort>) -> Self {
        Self {
            firewall,
            locator,
            lock: Mutex::new(()),
        }
    }

    /// Derive the state from which rules exist.
    pub fn current_state(&self) -> Result<IsolationState, IsolationError> {
        let outbound = self.firewall.rule_exists(OUTBOUND_RULE_NAME)?;
        let inbound = self.firewall.rule_exists(INBOUND_RULE_NAME)?;
        let state = IsolationState::from_presence(outbound, inbound);
        if state == IsolationState::Inconsistent {
            warn!(outbound, inbound, "Isolation rule pair is incomplete");
        }
        Ok(state)
    }

    /// Resolve the daemon executable path.
    pub fn locate_executable(&self) -> Result<PathBuf, IsolationError> {
        self.locator
            .locate()
            .ok_or(IsolationError::ExecutableNotFound)
    }

    /// Enable isolation for the located daemon executable.
    pub fn enable_located(&self) -> Result<IsolationState, IsolationError> {
        let path = self.locate_executable()?;
        self.enable(&path)
    }

    /// Create both blocking rules for `executable`.
    ///
    /// Rules that already exist are kept, so retrying after a partial
    /// failure completes the pair.
    pub fn enable(&self, executable: &Path) -> Result<IsolationState, IsolationError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        for rule in IsolationRule::pair(executable) {
            let result = match self.firewall.rule_exists(&rule.name) {
                Ok(true) => {
                    debug!(rule = %rule.name, "Isolation rule already present");
                    continue;
                }
                Ok(false) => self.firewall.add_rule(&rule),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                return Err(self.classify_failure(e));
            }
            debug!(rule = %rule.name, program = %rule.program.display(), "Added isolation rule");
        }

        info!(program = %executable.display(), "Network isolation enabled");
        Ok(IsolationState::On)
    }

    /// Remove both rules. Absent rules are skipped.
    ///
    /// Both removals are attempted even if the first fails.
    pub fn disable(&self) -> Result<IsolationState, IsolationError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let outbound = self.firewall.remove_rule(OUTBOUND_RULE_NAME);
        let inbound = self.firewall.remove_rule(INBOUND_RULE_NAME);
        if let Some(e) = outbound.err().or(inbound.err()) {
            return Err(self.classify_failure(e));
        }

        info!("Network isolation disabled");
        Ok(IsolationState::Off)
    }

    fn classify_failure(&self, error: FirewallError) -> IsolationError {
        match self.current_state() {
            Ok(IsolationState::Inconsistent) => IsolationError::Inconsistent { source: error },
            Ok(_) => IsolationError::Firewall(error),
            Err(recheck) => {
                warn!(error = %recheck, "Could not re-check isolation rules after failure");
                IsolationError::Firewall(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuleDirection;
    use crate::ports::MockFirewallPort;
    use crate::test_utils::{FixedLocator, InMemoryFirewall};

    const EXE: &str = "/opt/daemon/bin/daemon";

    fn controller(firewall: Arc<InMemoryFirewall>) -> NetworkIsolationController {
        NetworkIsolationController::new(firewall, Arc::new(FixedLocator::found(EXE)))
    }

    #[test]
    fn test_enable_then_disable() {
        let firewall = Arc::new(InMemoryFirewall::new());
        let isolation = controller(firewall.clone());

        assert_eq!(isolation.current_state().unwrap(), IsolationState::Off);
        assert_eq!(isolation.enable_located().unwrap(), IsolationState::On);
        assert_eq!(isolation.current_state().unwrap(), IsolationState::On);

        let rule = firewall.rule(OUTBOUND_RULE_NAME).unwrap();
        assert_eq!(rule.program, PathBuf::from(EXE));
        assert_eq!(rule.direction, RuleDirection::Outbound);

        assert_eq!(isolation.disable().unwrap(), IsolationState::Off);
        assert_eq!(isolation.current_state().unwrap(), IsolationState::Off);
        assert!(firewall.rule_names().is_empty());
    }

    #[test]
    fn test_disable_is_idempotent() {
        let isolation = controller(Arc::new(InMemoryFirewall::new()));
        assert_eq!(isolation.disable().unwrap(), IsolationState::Off);
        assert_eq!(isolation.disable().unwrap(), IsolationState::Off);
    }

    #[test]
    fn test_single_rule_is_inconsistent() {
        let firewall = InMemoryFirewall::new()
            .with_rule(IsolationRule::new(RuleDirection::Inbound, Path::new(EXE)));
        let isolation = controller(Arc::new(firewall));
        assert_eq!(
            isolation.current_state().unwrap(),
            IsolationState::Inconsistent
        );
    }

    #[test]
    fn test_partial_enable_is_reported_and_retryable() {
        let firewall = Arc::new(InMemoryFirewall::new().failing_add_of(INBOUND_RULE_NAME));
        let isolation = controller(firewall.clone());

        let err = isolation.enable(Path::new(EXE)).unwrap_err();
        assert!(matches!(err, IsolationError::Inconsistent { .. }));
        assert_eq!(firewall.rule_names(), vec![OUTBOUND_RULE_NAME.to_string()]);

        // Clearing the remnant works regardless
        assert_eq!(isolation.disable().unwrap(), IsolationState::Off);
    }

    #[test]
    fn test_first_rule_failure_is_plain_firewall_error() {
        let firewall = Arc::new(InMemoryFirewall::new().failing_add_of(OUTBOUND_RULE_NAME));
        let isolation = controller(firewall);

        let err = isolation.enable(Path::new(EXE)).unwrap_err();
        assert!(matches!(err, IsolationError::Firewall(_)));
        assert_eq!(isolation.current_state().unwrap(), IsolationState::Off);
    }

    #[test]
    fn test_missing_executable_touches_no_rule() {
        let mut firewall = MockFirewallPort::new();
        firewall.expect_rule_exists().never();
        firewall.expect_add_rule().never();
        firewall.expect_remove_rule().never();

        let isolation =
            NetworkIsolationController::new(Arc::new(firewall), Arc::new(FixedLocator::missing()));

        assert!(matches!(
            isolation.enable_located(),
            Err(IsolationError::ExecutableNotFound)
        ));
    }

    #[test]
    fn test_enable_skips_existing_rules() {
        let mut firewall = MockFirewallPort::new();
        firewall
            .expect_rule_exists()
            .withf(|name| name == OUTBOUND_RULE_NAME)
            .returning(|_| Ok(true));
        firewall
            .expect_rule_exists()
            .withf(|name| name == INBOUND_RULE_NAME)
            .returning(|_| Ok(false));
        firewall
            .expect_add_rule()
            .withf(|rule| rule.name == INBOUND_RULE_NAME)
            .times(1)
            .returning(|_| Ok(()));

        let isolation = NetworkIsolationController::new(
            Arc::new(firewall),
            Arc::new(FixedLocator::found(EXE)),
        );
        assert_eq!(
            isolation.enable(Path::new(EXE)).unwrap(),
            IsolationState::On
        );
    }

    #[test]
    fn test_permission_denied_surfaces() {
        let mut firewall = MockFirewallPort::new();
        firewall.expect_rule_exists().returning(|_| Ok(false));
        firewall
            .expect_add_rule()
            .returning(|_| Err(FirewallError::PermissionDenied("run as administrator".into())));

        let isolation = NetworkIsolationController::new(
            Arc::new(firewall),
            Arc::new(FixedLocator::found(EXE)),
        );
        let err = isolation.enable(Path::new(EXE)).unwrap_err();
        assert!(matches!(
            err,
            IsolationError::Firewall(FirewallError::PermissionDenied(_))
        ));
    }
}
