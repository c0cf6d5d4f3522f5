//! Network isolation of the daemon through a pair of firewall rules.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Display name of the rule blocking the daemon's outbound traffic.
pub const OUTBOUND_RULE_NAME: &str = "ModelkeepIsolationOut";

/// Display name of the rule blocking the daemon's inbound traffic.
pub const INBOUND_RULE_NAME: &str = "ModelkeepIsolationIn";

/// Traffic direction a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    Outbound,
    Inbound,
}

impl RuleDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "Outbound",
            Self::Inbound => "Inbound",
        }
    }

    /// The well-known rule name for this direction.
    pub const fn rule_name(self) -> &'static str {
        match self {
            Self::Outbound => OUTBOUND_RULE_NAME,
            Self::Inbound => INBOUND_RULE_NAME,
        }
    }
}

impl fmt::Display for RuleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blocking rule bound to one executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationRule {
    pub name: String,
    pub direction: RuleDirection,
    pub program: PathBuf,
}

impl IsolationRule {
    pub fn new(direction: RuleDirection, program: &Path) -> Self {
        Self {
            name: direction.rule_name().to_string(),
            direction,
            program: program.to_path_buf(),
        }
    }

    /// Outbound and inbound rules for `program`, in creation order.
    pub fn pair(program: &Path) -> [Self; 2] {
        [
            Self::new(RuleDirection::Outbound, program),
            Self::new(RuleDirection::Inbound, program),
        ]
    }

    /// Human readable description attached to the rule.
    pub fn description(&self) -> String {
        format!(
            "Block {} connections of the local model daemon",
            self.direction.as_str().to_lowercase()
        )
    }
}

/// Isolation state derived from rule presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationState {
    /// Both rules exist.
    On,
    /// Neither rule exists.
    Off,
    /// Exactly one rule exists. Treated as off.
    Inconsistent,
}

impl IsolationState {
    pub const fn from_presence(outbound: bool, inbound: bool) -> Self {
        match (outbound, inbound) {
            (true, true) => Self::On,
            (false, false) => Self::Off,
            _ => Self::Inconsistent,
        }
    }

    /// Only a complete rule pair blocks the daemon.
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for IsolationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Inconsistent => "inconsistent",
        })
    }
}
