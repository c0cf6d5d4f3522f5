//! Base-model selection used to repair definitions.

use async_trait::async_trait;

/// Capability to list candidate base models and let the user pick one.
///
/// Adapters implement this with whatever interaction they have (an input
/// prompt, a dialog, a fixed answer in tests).
#[async_trait]
pub trait BaseModelProvider: Send + Sync {
    /// Known models that may serve as a base, `None` if they cannot be listed.
    async fn available_models(&self) -> Option<Vec<String>>;

    /// Let the user choose among `candidates`. `None` means declined.
    async fn choose(&self, candidates: &[String]) -> Option<String>;
}
