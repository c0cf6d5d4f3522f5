//! Model builder port.
//!
//! Building a model from a definition and duplicating a model under a new
//! name are the only write primitives the daemon offers besides deletion.
//! There is no atomic rename or in-place replace.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from build and copy operations.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The daemon rejected the definition or the copy.
    #[error("Daemon rejected '{name}': {message}")]
    Rejected { name: String, message: String },

    /// The build surface (executable or endpoint) is not available.
    #[error("Build surface unavailable: {0}")]
    Unavailable(String),

    /// Local I/O failed while staging the definition.
    #[error("I/O error while building: {0}")]
    Io(String),
}

/// Port for creating models.
#[async_trait]
pub trait ModelBuilderPort: Send + Sync {
    /// Build `definition` under `name`, overwriting nothing that is not `name`.
    async fn build(&self, name: &str, definition: &str) -> Result<(), BuildError>;

    /// Duplicate model `source` as `destination`.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), BuildError>;
}
