//! Starting the daemon service.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use modelkeep_core::DaemonClientPort;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to start {path}: {reason}")]
    Spawn { path: PathBuf, reason: String },

    #[error("Daemon did not answer within {0:?} after starting")]
    NotReady(Duration),
}

/// Launches `<exe> serve` as a detached background process.
#[derive(Debug, Clone)]
pub struct DaemonLauncher {
    executable: PathBuf,
    poll_interval: Duration,
}

impl DaemonLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            poll_interval: Duration::from_millis(500),
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Spawn the service and return its process id.
    ///
    /// The child is not waited on; it keeps running after this process exits.
    pub fn spawn_serve(&self) -> Result<u32, LaunchError> {
        let child = Command::new(&self.executable)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                path: self.executable.clone(),
                reason: e.to_string(),
            })?;
        let pid = child.id();
        info!(pid, executable = %self.executable.display(), "Started daemon service");
        Ok(pid)
    }

    /// Poll `client` until the daemon answers or `timeout` elapses.
    pub async fn wait_until_ready(
        &self,
        client: &dyn DaemonClientPort,
        timeout: Duration,
    ) -> Result<(), LaunchError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            if client.check_connection().await {
                info!(attempt, "Daemon is ready");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LaunchError::NotReady(timeout));
            }
            debug!(attempt, "Daemon not ready yet, retrying");
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelkeep_core::test_utils::FakeCatalog;

    #[test]
    fn test_spawn_missing_executable() {
        let launcher = DaemonLauncher::new("/definitely/not/here/ollama");
        assert!(matches!(
            launcher.spawn_serve(),
            Err(LaunchError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_until_ready_when_reachable() {
        let catalog = FakeCatalog::new();
        let launcher = DaemonLauncher::new("ollama").with_poll_interval(Duration::from_millis(1));
        let daemon = catalog.daemon();
        launcher
            .wait_until_ready(&daemon, Duration::from_millis(50))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out() {
        let catalog = FakeCatalog::new().unreachable();
        let launcher = DaemonLauncher::new("ollama").with_poll_interval(Duration::from_millis(1));
        let daemon = catalog.daemon();
        let result = launcher
            .wait_until_ready(&daemon, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(LaunchError::NotReady(_))));
    }
}
