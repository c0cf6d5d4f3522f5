//! Printing core events to the terminal.

use modelkeep_core::{AppEvent, AppEventEmitter};

/// Writes progress and outcome events to stderr.
///
/// Stdout stays reserved for command output such as definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleEmitter {
    quiet: bool,
}

impl ConsoleEmitter {
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

/// Line printed for `event`, if any.
pub fn render(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::OperationStarted { intent, model } => Some(format!("▶ {intent} {model}")),
        AppEvent::OperationProgress { message, .. } => Some(format!("  {message}")),
        AppEvent::OperationFinished {
            success: true,
            intent,
            model,
            ..
        } => Some(format!("✅ {intent} {model} finished")),
        AppEvent::OperationFinished {
            urgent: true,
            model,
            error,
            ..
        } => Some(format!(
            "🚨 URGENT: '{model}' may be missing from the catalog. {}",
            error.as_deref().unwrap_or("")
        )),
        AppEvent::OperationFinished { .. } => None,
        AppEvent::OperationDetached { intent, model } => Some(format!(
            "⚠ Stopped following {intent} of '{model}'; it may not be complete"
        )),
        AppEvent::PullProgress { model, status } => Some(format!("  {model}: {status}")),
        AppEvent::ModelRemoved { model } => Some(format!("Removed {model}")),
        AppEvent::BackupCaptured { model, location } => {
            Some(format!("  Backed up {model} to {location}"))
        }
        AppEvent::IsolationChanged { state } => Some(format!("Network isolation is {state}")),
    }
}

impl AppEventEmitter for ConsoleEmitter {
    fn emit(&self, event: AppEvent) {
        if self.quiet && event.is_progress() {
            return;
        }
        if let Some(line) = render(&event) {
            eprintln!("{line}");
        }
    }
}
