//! Command handlers.
//!
//! Each handler takes the composed `CliContext`, delegates to the
//! `ModelManager` and prints the result.

pub mod backups;
pub mod check;
pub mod delete;
pub mod export;
pub mod isolation;
pub mod list;
pub mod mutate;
pub mod pull;
pub mod show;
pub mod template;

use modelkeep_core::OperationHandle;

use crate::error::CliError;

/// Wait for an admitted operation. Ctrl-C stops the progress output but the
/// wait continues, since exiting would abort the operation mid-way.
pub async fn follow<T>(handle: OperationHandle<T>) -> Result<T, CliError> {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let (result, notice) = handle.wait_detachable(interrupt).await;
    if notice.is_some() {
        eprintln!("Waiting for the daemon to finish so no model is left half replaced...");
    }
    Ok(result?)
}
