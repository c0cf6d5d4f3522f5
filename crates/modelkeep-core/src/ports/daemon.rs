//! Daemon port for querying and editing the model catalog.
//!
//! The daemon owns the catalog. This port exposes the calls the core needs
//! without leaking HTTP details; the implementation lives in
//! `modelkeep-daemon`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ModelInfo, ModelSummary};

/// Errors reported by the daemon port.
///
/// Expected conditions (daemon down, model missing) are values of this
/// type, never panics.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The daemon could not be reached (not started, or isolated).
    #[error("Daemon unreachable: {0}")]
    Unreachable(String),

    /// The named model does not exist.
    #[error("Model not found: {0}")]
    NotFound(String),

    /// The daemon answered with an error status.
    #[error("Daemon returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The daemon accepted the request but reported a failure while
    /// carrying it out.
    #[error("Daemon rejected the request: {0}")]
    Rejected(String),

    /// The daemon answered with something we could not interpret.
    #[error("Invalid daemon response: {0}")]
    InvalidResponse(String),
}

/// Port for the inference daemon's catalog API.
#[async_trait]
pub trait DaemonClientPort: Send + Sync {
    /// Quick reachability check.
    async fn check_connection(&self) -> bool;

    /// All models in the catalog.
    async fn list_models(&self) -> Result<Vec<ModelSummary>, DaemonError>;

    /// Full information for one model, `None` if it does not exist.
    async fn show_model(&self, name: &str) -> Result<Option<ModelInfo>, DaemonError>;

    /// Delete a model. Fails with `NotFound` if it does not exist.
    async fn delete_model(&self, name: &str) -> Result<(), DaemonError>;

    /// Download a model, passing each new status line to `progress`.
    ///
    /// Returns once the daemon has finished the download.
    async fn pull_model(
        &self,
        name: &str,
        progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<(), DaemonError>;
}
