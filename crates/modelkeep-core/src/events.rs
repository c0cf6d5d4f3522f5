//! Canonical event union reported to the presentation layer.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "operation_progress", "intent": "save", "model": "foo", "message": "Building foo_temp_1700000000" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{IsolationState, OperationIntent};

/// Events emitted by core services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    // ========== Operation Events ==========
    /// A mutating operation was admitted by the coordinator.
    OperationStarted {
        intent: OperationIntent,
        model: String,
    },

    /// Advisory progress text for the running operation.
    OperationProgress {
        intent: OperationIntent,
        model: String,
        message: String,
    },

    /// The running operation reached a terminal state.
    OperationFinished {
        intent: OperationIntent,
        model: String,
        success: bool,
        /// Failure description, if any.
        error: Option<String>,
        /// True for failures that need the user's immediate attention.
        urgent: bool,
    },

    /// The view stopped following the running operation. The operation
    /// itself keeps going and may not be complete.
    OperationDetached {
        intent: OperationIntent,
        model: String,
    },

    // ========== Model Events ==========
    /// A model was removed from the catalog.
    ModelRemoved { model: String },

    /// A definition was backed up before being replaced.
    BackupCaptured { model: String, location: String },

    /// Status line from a running download.
    PullProgress { model: String, status: String },

    // ========== Isolation Events ==========
    /// The isolation state changed.
    IsolationChanged { state: IsolationState },
}

impl AppEvent {
    pub fn progress(
        intent: OperationIntent,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OperationProgress {
            intent,
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn model_removed(model: impl Into<String>) -> Self {
        Self::ModelRemoved {
            model: model.into(),
        }
    }

    /// True for events that only carry advisory progress.
    pub const fn is_progress(&self) -> bool {
        matches!(
            self,
            Self::OperationProgress { .. } | Self::PullProgress { .. }
        )
    }
}
