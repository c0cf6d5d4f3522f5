//! Check command handler.

use std::time::Duration;

use modelkeep_core::ErrorKind;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Report whether the daemon answers, starting it first if asked to.
pub async fn execute(ctx: &CliContext, start: bool, wait_secs: u64) -> Result<(), CliError> {
    let url = ctx.settings.effective_daemon_url();
    if ctx.manager().check_connection().await {
        println!("✅ Daemon is reachable at {url}");
        return Ok(());
    }

    if !start {
        return Err(CliError::Core {
            kind: ErrorKind::TransientConnectivity,
            message: format!(
                "Daemon is not reachable at {url}. Start it with 'modelkeep check --start'."
            ),
        });
    }

    let launcher = ctx.launcher();
    let pid = launcher
        .spawn_serve()
        .map_err(|e| CliError::Process(e.to_string()))?;
    println!("Started daemon (pid {pid}), waiting for it to answer...");

    launcher
        .wait_until_ready(ctx.daemon.as_ref(), Duration::from_secs(wait_secs))
        .await
        .map_err(|e| CliError::Core {
            kind: ErrorKind::TransientConnectivity,
            message: e.to_string(),
        })?;
    println!("✅ Daemon is reachable at {url}");
    Ok(())
}
