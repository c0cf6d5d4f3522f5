//! Firewall backends for the isolation rule pair.
//!
//! On Windows the rules are managed with the `NetSecurity` PowerShell
//! cmdlets. Other platforms get [`UnsupportedFirewall`], which reports
//! isolation as off and refuses to add rules.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modelkeep_core::{FirewallError, FirewallPort, IsolationRule, RuleDirection};
use tracing::{debug, info};

use crate::command::{CommandOutput, CommandRunner, SystemCommandRunner};

const POWERSHELL: &str = "powershell";

/// Firewall rules through `Get-/New-/Remove-NetFirewallRule`.
pub struct PowerShellFirewall<R: CommandRunner = SystemCommandRunner> {
    runner: R,
    program: PathBuf,
}

impl PowerShellFirewall {
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner)
    }
}

impl Default for PowerShellFirewall {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> PowerShellFirewall<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: PathBuf::from(POWERSHELL),
        }
    }

    fn run_script(&self, rule: &str, script: &str) -> Result<CommandOutput, FirewallError> {
        let args: Vec<OsString> = ["-NoProfile", "-NonInteractive", "-Command", script]
            .into_iter()
            .map(OsString::from)
            .collect();
        debug!(rule = %rule, script = %script, "Running firewall command");
        self.runner
            .run(&self.program, &args)
            .map_err(|e| spawn_error(&self.program, &e))
    }
}

/// Quote a value as a PowerShell single-quoted literal.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn spawn_error(program: &Path, err: &io::Error) -> FirewallError {
    if err.kind() == io::ErrorKind::NotFound {
        FirewallError::Unsupported(format!("{} is not available", program.display()))
    } else {
        FirewallError::CommandFailed {
            rule: String::new(),
            message: err.to_string(),
        }
    }
}

fn command_error(rule: &str, output: &CommandOutput) -> FirewallError {
    let message = output.message();
    let lowered = format!("{} {}", output.stderr, output.stdout).to_lowercase();
    if lowered.contains("access is denied") || lowered.contains("permissiondenied") {
        FirewallError::PermissionDenied(message)
    } else {
        FirewallError::CommandFailed {
            rule: rule.to_string(),
            message,
        }
    }
}

fn new_rule_script(rule: &IsolationRule) -> String {
    let mut script = format!(
        "New-NetFirewallRule -DisplayName {} -Direction {} -Program {} -Action Block -Description {}",
        ps_quote(&rule.name),
        rule.direction.as_str(),
        ps_quote(&rule.program.to_string_lossy()),
        ps_quote(&rule.description()),
    );
    if rule.direction == RuleDirection::Inbound {
        script.push_str(" -LocalPort Any -RemotePort Any");
    }
    script.push_str(" -ErrorAction Stop | Out-Null");
    script
}

impl<R: CommandRunner> FirewallPort for PowerShellFirewall<R> {
    fn rule_exists(&self, name: &str) -> Result<bool, FirewallError> {
        let script = format!(
            "if (Get-NetFirewallRule -DisplayName {} -ErrorAction SilentlyContinue) {{ exit 0 }} else {{ exit 1 }}",
            ps_quote(name)
        );
        let output = self.run_script(name, &script)?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_error(name, &output)),
        }
    }

    fn add_rule(&self, rule: &IsolationRule) -> Result<(), FirewallError> {
        let output = self.run_script(&rule.name, &new_rule_script(rule))?;
        if !output.is_success() {
            return Err(command_error(&rule.name, &output));
        }
        info!(rule = %rule.name, program = %rule.program.display(), "Added firewall rule");
        Ok(())
    }

    fn remove_rule(&self, name: &str) -> Result<(), FirewallError> {
        let script = format!(
            "Remove-NetFirewallRule -DisplayName {} -ErrorAction SilentlyContinue",
            ps_quote(name)
        );
        let output = self.run_script(name, &script)?;
        if !output.is_success() {
            return Err(command_error(name, &output));
        }
        info!(rule = %name, "Removed firewall rule");
        Ok(())
    }
}

/// Backend for platforms without a supported firewall tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedFirewall;

impl FirewallPort for UnsupportedFirewall {
    fn rule_exists(&self, _name: &str) -> Result<bool, FirewallError> {
        Ok(false)
    }

    fn add_rule(&self, rule: &IsolationRule) -> Result<(), FirewallError> {
        Err(FirewallError::Unsupported(format!(
            "cannot add rule '{}' on {}",
            rule.name,
            std::env::consts::OS
        )))
    }

    fn remove_rule(&self, _name: &str) -> Result<(), FirewallError> {
        Ok(())
    }
}

/// Firewall backend for the current platform.
pub fn platform_firewall() -> Arc<dyn FirewallPort> {
    if cfg!(windows) {
        Arc::new(PowerShellFirewall::new())
    } else {
        Arc::new(UnsupportedFirewall)
    }
}
