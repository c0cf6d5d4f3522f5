//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where adapters are wired together for the
//! CLI:
//! - Daemon HTTP client (via modelkeep-daemon)
//! - Build backend, firewall, executable lookup and backup files (via
//!   modelkeep-runtime)
//! - The `ModelManager` facade (via modelkeep-core)

use std::path::PathBuf;
use std::sync::Arc;

use modelkeep_core::ports::{AppEventEmitter, ExecutableLocatorPort, ModelBuilderPort};
use modelkeep_core::{
    BuildBackend, DaemonClientPort, ModelManager, Ports, Settings, validate_settings,
};
use modelkeep_daemon::{DaemonClientConfig, DefaultDaemonClient, DefaultHttpModelBuilder};
use modelkeep_runtime::{
    CliModelBuilder, DAEMON_PROGRAM, DaemonExecutableLocator, DaemonLauncher,
    FsBackupRepository, platform_firewall,
};
use tracing::debug;

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub settings: Settings,
}

impl CliConfig {
    /// Environment settings overlaid with command-line overrides.
    pub fn load(overrides: Settings) -> Result<Self, CliError> {
        let env = Settings::from_env().map_err(|e| CliError::Config(e.to_string()))?;
        Self::from_sources(env, overrides)
    }

    pub fn from_sources(env: Settings, overrides: Settings) -> Result<Self, CliError> {
        let mut settings = env;
        settings.merge(overrides);
        validate_settings(&settings).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Self { settings })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// The core facade.
    pub manager: ModelManager,
    /// Daemon client, for readiness polling after a start.
    pub daemon: Arc<dyn DaemonClientPort>,
    /// Effective settings.
    pub settings: Settings,
    /// Resolved daemon executable, if one was found.
    pub executable: Option<PathBuf>,
}

impl CliContext {
    pub const fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// Launcher for the resolved executable, falling back to `PATH` lookup at
    /// spawn time.
    pub fn launcher(&self) -> DaemonLauncher {
        DaemonLauncher::new(
            self.executable
                .clone()
                .unwrap_or_else(|| PathBuf::from(DAEMON_PROGRAM)),
        )
    }
}

/// Bootstrap the CLI application.
///
/// Adapters are chosen from the settings; nothing touches the network or the
/// firewall until a command runs.
pub fn bootstrap(
    config: CliConfig,
    events: Arc<dyn AppEventEmitter>,
) -> Result<CliContext, CliError> {
    let settings = config.settings;
    let client_config = DaemonClientConfig::from_settings(&settings);

    let daemon: Arc<dyn DaemonClientPort> = Arc::new(
        DefaultDaemonClient::new(&client_config).map_err(|e| CliError::Config(e.to_string()))?,
    );

    let locator = Arc::new(DaemonExecutableLocator::new(
        settings.daemon_executable.clone(),
    ));
    let executable = locator.locate();

    let builder: Arc<dyn ModelBuilderPort> = match settings.effective_build_backend() {
        BuildBackend::Http => Arc::new(
            DefaultHttpModelBuilder::new(&client_config)
                .map_err(|e| CliError::Config(e.to_string()))?,
        ),
        BuildBackend::Cli => Arc::new(CliModelBuilder::new(
            executable
                .clone()
                .unwrap_or_else(|| PathBuf::from(DAEMON_PROGRAM)),
        )),
    };

    let backups = FsBackupRepository::resolved(settings.backup_dir.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;
    debug!(
        url = %settings.effective_daemon_url(),
        backend = %settings.effective_build_backend(),
        backups = %backups.dir().display(),
        "Bootstrapped CLI"
    );

    let locator: Arc<dyn ExecutableLocatorPort> = locator;
    let ports = Ports {
        daemon: daemon.clone(),
        builder,
        backups: Arc::new(backups),
        firewall: platform_firewall(),
        locator,
    };

    Ok(CliContext {
        manager: ModelManager::new(ports, events),
        daemon,
        settings,
        executable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelkeep_core::NoopEmitter;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_flags_override_environment() {
        let env = Settings {
            daemon_url: Some("http://env-host:11434".into()),
            request_timeout_secs: Some(10),
            ..Settings::default()
        };
        let flags = Settings {
            daemon_url: Some("http://flag-host:11434".into()),
            ..Settings::default()
        };
        let config = assert_ok!(CliConfig::from_sources(env, flags));
        assert_eq!(config.settings.effective_daemon_url(), "http://flag-host:11434");
        assert_eq!(config.settings.request_timeout_secs, Some(10));
    }

    #[test]
    fn test_invalid_timeout_is_config_error() {
        let flags = Settings {
            request_timeout_secs: Some(0),
            ..Settings::default()
        };
        let err = assert_err!(CliConfig::from_sources(Settings::default(), flags));
        assert!(matches!(err, CliError::Config(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_with_http_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            build_backend: Some(BuildBackend::Http),
            backup_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let ctx = bootstrap(CliConfig { settings }, Arc::new(NoopEmitter::new())).unwrap();
        assert_eq!(ctx.settings.effective_build_backend(), BuildBackend::Http);
        assert!(assert_ok!(ctx.manager().list_backups().await).is_empty());
    }
}
