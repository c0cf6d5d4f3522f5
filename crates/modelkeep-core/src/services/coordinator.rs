//! Global admission control for mutating operations.
//!
//! At most one operation runs at a time, system wide. A second submission
//! while one is running is rejected with [`CoordinatorError::Busy`]; nothing
//! is queued. Admitted work runs on a spawned task so the caller stays
//! responsive.
//!
//! Daemon calls cannot be interrupted. [`OperationHandle::cancel`] therefore
//! only detaches the view: progress events stop, the task keeps going, and
//! the coordinator stays busy until it ends.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::domain::{OperationIntent, PendingOperation};
use crate::error::CoreError;
use crate::events::AppEvent;
use crate::ports::AppEventEmitter;

use super::mutator::{ModelMutator, MutationOutcome};

/// Errors from admission.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Another operation is running.
    #[error("Busy: {intent} of '{target}' is still running")]
    Busy {
        intent: OperationIntent,
        target: String,
    },
}

/// Coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Running(PendingOperation),
}

impl CoordinatorState {
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

/// Serializes mutating operations.
pub struct OperationCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
    events: Arc<dyn AppEventEmitter>,
}

impl OperationCoordinator {
    pub fn new(events: Arc<dyn AppEventEmitter>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CoordinatorState::Idle)),
            events,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CoordinatorState {
        lock(&self.state).clone()
    }

    /// Validate, admit and start a create-or-replace.
    ///
    /// Name and definition checks run first, so malformed input is rejected
    /// without touching the daemon or the coordinator state.
    pub fn submit_mutation(
        &self,
        mutator: Arc<ModelMutator>,
        name: &str,
        definition: &str,
        intent: OperationIntent,
    ) -> Result<OperationHandle<MutationOutcome>, CoreError> {
        ModelMutator::preflight(name, definition, intent)?;

        let target = name.to_string();
        let definition = definition.to_string();
        self.spawn(intent, name, move |events| async move {
            mutator
                .create_or_replace(&target, &definition, intent, events.as_ref())
                .await
                .map_err(CoreError::from)
        })
    }

    /// Admit `work` and run it on a background task.
    ///
    /// `work` receives the emitter to report progress through; it stops
    /// forwarding progress once the handle is cancelled.
    pub fn spawn<T, F, Fut>(
        &self,
        intent: OperationIntent,
        target: &str,
        work: F,
    ) -> Result<OperationHandle<T>, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn AppEventEmitter>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let admission = self.admit(intent, target)?;

        let attached = Arc::new(AtomicBool::new(true));
        let gated: Arc<dyn AppEventEmitter> = Arc::new(GatedEmitter {
            inner: self.events.clone(),
            attached: attached.clone(),
        });
        self.events.emit(AppEvent::OperationStarted {
            intent,
            model: target.to_string(),
        });

        let future = work(gated);
        let events = self.events.clone();
        let model = target.to_string();
        let join = tokio::spawn(async move {
            let result = future.await;
            match &result {
                Ok(_) => info!(%intent, model = %model, "Operation finished"),
                Err(e) => warn!(%intent, model = %model, error = %e, "Operation failed"),
            }
            // Idle before the outcome is visible, so a listener may submit next.
            drop(admission);
            events.emit(AppEvent::OperationFinished {
                intent,
                model,
                success: result.is_ok(),
                error: result.as_ref().err().map(ToString::to_string),
                urgent: result.as_ref().err().is_some_and(CoreError::is_urgent),
            });
            result
        });

        Ok(OperationHandle {
            intent,
            target: target.to_string(),
            attached,
            events: self.events.clone(),
            join,
        })
    }

    fn admit(&self, intent: OperationIntent, target: &str) -> Result<Admission, CoordinatorError> {
        let mut state = lock(&self.state);
        if let CoordinatorState::Running(running) = &*state {
            debug!(%intent, target, running = %running.target, "Rejected while busy");
            return Err(CoordinatorError::Busy {
                intent: running.intent,
                target: running.target.clone(),
            });
        }
        *state = CoordinatorState::Running(PendingOperation::new(intent, target));
        Ok(Admission {
            state: self.state.clone(),
        })
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the coordinator to idle when dropped, including on panic.
struct Admission {
    state: Arc<Mutex<CoordinatorState>>,
}

impl Drop for Admission {
    fn drop(&mut self) {
        *lock(&self.state) = CoordinatorState::Idle;
    }
}

/// Forwards events while the view is attached; progress is dropped after.
struct GatedEmitter {
    inner: Arc<dyn AppEventEmitter>,
    attached: Arc<AtomicBool>,
}

impl AppEventEmitter for GatedEmitter {
    fn emit(&self, event: AppEvent) {
        if event.is_progress() && !self.attached.load(Ordering::Acquire) {
            return;
        }
        self.inner.emit(event);
    }
}

/// Notice returned when the view detaches from a running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachNotice {
    pub intent: OperationIntent,
    pub target: String,
}

impl fmt::Display for DetachNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stopped following {} of '{}'. The operation continues in the background and may not be complete",
            self.intent, self.target
        )
    }
}

/// Handle to an admitted operation.
pub struct OperationHandle<T> {
    intent: OperationIntent,
    target: String,
    attached: Arc<AtomicBool>,
    events: Arc<dyn AppEventEmitter>,
    join: JoinHandle<Result<T, CoreError>>,
}

impl<T> fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("intent", &self.intent)
            .field("target", &self.target)
            .field("finished", &self.join.is_finished())
            .finish_non_exhaustive()
    }
}

impl<T> OperationHandle<T> {
    pub const fn intent(&self) -> OperationIntent {
        self.intent
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop surfacing progress. The operation itself is not interrupted.
    pub fn cancel(&self) -> DetachNotice {
        detach(&self.attached, self.events.as_ref(), self.intent, &self.target)
    }

    /// Wait for the operation to end.
    pub async fn wait(self) -> Result<T, CoreError> {
        joined(self.join.await)
    }

    /// Wait for the operation to end, detaching once `detach` resolves.
    ///
    /// Detaching does not stop the wait: the operation still runs to its end
    /// and its result is returned along with the notice.
    pub async fn wait_detachable<F>(self, detach_signal: F) -> (Result<T, CoreError>, Option<DetachNotice>)
    where
        F: Future<Output = ()>,
    {
        let Self {
            intent,
            target,
            attached,
            events,
            mut join,
        } = self;
        tokio::pin!(detach_signal);

        tokio::select! {
            result = &mut join => (joined(result), None),
            () = &mut detach_signal => {
                let notice = detach(&attached, events.as_ref(), intent, &target);
                (joined(join.await), Some(notice))
            }
        }
    }
}

fn detach(
    attached: &AtomicBool,
    events: &dyn AppEventEmitter,
    intent: OperationIntent,
    target: &str,
) -> DetachNotice {
    if attached.swap(false, Ordering::AcqRel) {
        events.emit(AppEvent::OperationDetached {
            intent,
            model: target.to_string(),
        });
    }
    DetachNotice {
        intent,
        target: target.to_string(),
    }
}

fn joined<T>(result: Result<Result<T, CoreError>, JoinError>) -> Result<T, CoreError> {
    result.map_err(|e| CoreError::Internal(format!("operation task failed: {e}")))?
}
