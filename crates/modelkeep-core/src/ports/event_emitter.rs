//! Event emitter trait for reporting operation progress to the view.
//!
//! Implementations handle transport details (channels, terminal output, ...).

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// This abstraction keeps progress reporting out of service signatures'
/// concrete types and lets the coordinator gate what reaches the view.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without a listener
/// - `ChannelEmitter` - Forwards into a tokio mpsc channel
pub trait AppEventEmitter: Send + Sync {
    /// Emit an application event.
    ///
    /// This method should not block.
    fn emit(&self, event: AppEvent);
}

/// A no-op event emitter for tests and CLI contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {
        // Intentionally do nothing
    }
}

/// Emitter forwarding events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: tokio::sync::mpsc::UnboundedSender<AppEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiving end of its channel.
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AppEventEmitter for ChannelEmitter {
    fn emit(&self, event: AppEvent) {
        // Receiver gone means nobody is watching anymore
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationIntent;
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter = NoopEmitter::new();

        // Should not panic
        emitter.emit(AppEvent::model_removed("foo"));
    }

    #[test]
    fn test_arc_emitter() {
        let emitter: Arc<dyn AppEventEmitter> = Arc::new(NoopEmitter::new());
        emitter.emit(AppEvent::model_removed("foo"));
    }

    #[tokio::test]
    async fn test_channel_emitter_forwards() {
        let (emitter, mut rx) = ChannelEmitter::channel();
        emitter.emit(AppEvent::progress(OperationIntent::Save, "foo", "building"));
        drop(emitter);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::OperationProgress { .. }));
        assert!(rx.recv().await.is_none());
    }
}
