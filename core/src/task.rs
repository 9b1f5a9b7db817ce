//! The handle returned from `Session::data_task`.
//!
//! # Design
//! A `DataTask` owns the caller's completion handler and hands it out exactly
//! once, so every `Session` implementation gets "one terminal outcome,
//! delivered at most once" for free. Implementations attach the work to run
//! on first `resume` with `on_resume` and finish the task with `complete`.
//!
//! State transitions:
//!
//! ```text
//! Suspended --resume--> Running --complete--> Completed
//!     |                    |                      ^
//!     +------cancel--------+--> Canceling --------+
//! ```
//!
//! A task cancelled while still suspended never runs its job and finishes
//! immediately. What a cancelled task delivers is decided by its
//! `CancelBehavior`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::SessionError;
use crate::http::{HttpRequest, HttpResponse};

/// The single outcome of a data task: body bytes plus response metadata, or
/// an error.
pub type DataTaskResult = Result<(Vec<u8>, HttpResponse), SessionError>;

/// Callback invoked with the outcome of a data task, on whichever thread the
/// implementation completes it.
pub type CompletionHandler = Box<dyn FnOnce(DataTaskResult) + Send + 'static>;

type Job = Box<dyn FnOnce(DataTask) + Send + 'static>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a `DataTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Suspended,
    Running,
    Canceling,
    Completed,
}

/// What a cancelled task hands its completion handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelBehavior {
    /// Deliver `Err(SessionError::Cancelled)`.
    #[default]
    Report,
    /// Drop the handler without calling it.
    Silent,
}

/// Shared handle to one in-flight request. Clones refer to the same task.
#[derive(Clone)]
pub struct DataTask {
    inner: Arc<Inner>,
}

struct Inner {
    id: u64,
    request: HttpRequest,
    slots: Mutex<Slots>,
}

struct Slots {
    state: TaskState,
    handler: Option<CompletionHandler>,
    job: Option<Job>,
    cancel_behavior: CancelBehavior,
    cancelled: bool,
}

impl DataTask {
    /// Create a suspended task for `request` that will report to `handler`.
    pub fn new(request: HttpRequest, handler: CompletionHandler) -> Self {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        debug!(task = id, method = %request.method, url = %request.url, "data task created");
        Self {
            inner: Arc::new(Inner {
                id,
                request,
                slots: Mutex::new(Slots {
                    state: TaskState::Suspended,
                    handler: Some(handler),
                    job: None,
                    cancel_behavior: CancelBehavior::default(),
                    cancelled: false,
                }),
            }),
        }
    }

    /// Work to run the first time the task is resumed. The job receives a
    /// clone of the task and is expected to eventually call `complete`.
    pub fn on_resume(self, job: impl FnOnce(DataTask) + Send + 'static) -> Self {
        self.inner.slots.lock().job = Some(Box::new(job));
        self
    }

    pub fn with_cancel_behavior(self, behavior: CancelBehavior) -> Self {
        self.inner.slots.lock().cancel_behavior = behavior;
        self
    }

    /// Process-wide unique identifier, increasing in creation order.
    pub fn task_identifier(&self) -> u64 {
        self.inner.id
    }

    pub fn original_request(&self) -> &HttpRequest {
        &self.inner.request
    }

    /// `Completed` is set before the handler runs, so it does not mean the
    /// handler has returned.
    pub fn state(&self) -> TaskState {
        self.inner.slots.lock().state
    }

    /// Whether `cancel` took effect. Stays true once the task completes.
    pub fn is_cancelled(&self) -> bool {
        self.inner.slots.lock().cancelled
    }

    /// Start a suspended task. Has no effect in any other state.
    pub fn resume(&self) {
        let job = {
            let mut slots = self.inner.slots.lock();
            if slots.state != TaskState::Suspended {
                return;
            }
            slots.state = TaskState::Running;
            slots.job.take()
        };
        debug!(task = self.inner.id, "data task resumed");
        if let Some(job) = job {
            job(self.clone());
        }
    }

    /// Request cancellation. A task that never started finishes right away;
    /// a running one finishes when its implementation calls `complete`.
    pub fn cancel(&self) {
        let was_suspended = {
            let mut slots = self.inner.slots.lock();
            let previous = slots.state;
            match previous {
                TaskState::Canceling | TaskState::Completed => return,
                TaskState::Suspended | TaskState::Running => {}
            }
            slots.state = TaskState::Canceling;
            slots.cancelled = true;
            slots.job = None;
            previous == TaskState::Suspended
        };
        debug!(task = self.inner.id, "data task cancelled");
        if was_suspended {
            self.complete(Err(SessionError::Cancelled));
        }
    }

    /// Finish the task with `outcome`. If the task was cancelled, the
    /// handler gets the cancellation per `CancelBehavior` instead. Only the
    /// first call has any effect.
    pub fn complete(&self, outcome: DataTaskResult) {
        let (handler, outcome) = {
            let mut slots = self.inner.slots.lock();
            if slots.state == TaskState::Completed {
                return;
            }
            let cancelled = slots.state == TaskState::Canceling;
            slots.state = TaskState::Completed;
            slots.job = None;
            let handler = slots.handler.take();
            match (cancelled, slots.cancel_behavior) {
                (false, _) => (handler, outcome),
                (true, CancelBehavior::Report) => (handler, Err(SessionError::Cancelled)),
                (true, CancelBehavior::Silent) => {
                    drop(slots);
                    drop(handler);
                    debug!(task = self.inner.id, "cancelled data task dropped its handler");
                    return;
                }
            }
        };
        debug!(task = self.inner.id, ok = outcome.is_ok(), "data task completed");
        if let Some(handler) = handler {
            handler(outcome);
        }
    }
}

impl fmt::Debug for DataTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTask")
            .field("id", &self.inner.id)
            .field("url", &self.inner.request.url)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn ok_outcome() -> DataTaskResult {
        Ok((b"body".to_vec(), HttpResponse::new(200, "http://localhost")))
    }

    fn recording_task() -> (DataTask, mpsc::Receiver<DataTaskResult>) {
        let (tx, rx) = mpsc::channel();
        let task = DataTask::new(
            HttpRequest::get("http://localhost"),
            Box::new(move |outcome| {
                tx.send(outcome).unwrap();
            }),
        );
        (task, rx)
    }

    #[test]
    fn new_task_is_suspended() {
        let (task, rx) = recording_task();
        assert_eq!(task.state(), TaskState::Suspended);
        assert_eq!(task.original_request().url, "http://localhost");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn identifiers_increase() {
        let (a, _) = recording_task();
        let (b, _) = recording_task();
        assert!(b.task_identifier() > a.task_identifier());
    }

    #[test]
    fn resume_runs_job_once() {
        let (tx, rx) = mpsc::channel();
        let (task, _outcomes) = recording_task();
        let task = task.on_resume(move |_| tx.send(()).unwrap());
        task.resume();
        task.resume();
        assert_eq!(task.state(), TaskState::Running);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn complete_delivers_exactly_once() {
        let (task, rx) = recording_task();
        task.resume();
        task.complete(ok_outcome());
        task.complete(Err(SessionError::Timeout));
        assert_eq!(task.state(), TaskState::Completed);
        let outcomes: Vec<_> = rx.try_iter().collect();
        assert_eq!(outcomes, vec![ok_outcome()]);
    }

    #[test]
    fn cancel_before_resume_reports_cancelled_and_skips_job() {
        let (started_tx, started_rx) = mpsc::channel();
        let (task, rx) = recording_task();
        let task = task.on_resume(move |_| started_tx.send(()).unwrap());
        task.cancel();
        task.resume();
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(rx.try_recv().unwrap(), Err(SessionError::Cancelled));
        assert!(started_rx.try_recv().is_err());
    }

    #[test]
    fn cancel_while_running_replaces_outcome() {
        let (task, rx) = recording_task();
        task.resume();
        task.cancel();
        assert!(task.is_cancelled());
        task.complete(ok_outcome());
        assert_eq!(rx.try_recv().unwrap(), Err(SessionError::Cancelled));
    }

    #[test]
    fn cancellation_is_remembered_after_completion() {
        let (task, rx) = recording_task();
        task.resume();
        task.cancel();
        task.complete(ok_outcome());
        assert_eq!(task.state(), TaskState::Completed);
        assert!(task.is_cancelled());
        assert_eq!(rx.try_recv().unwrap(), Err(SessionError::Cancelled));

        let (finished, _rx) = recording_task();
        finished.resume();
        finished.complete(ok_outcome());
        finished.cancel();
        assert!(!finished.is_cancelled());
    }

    #[test]
    fn state_reads_completed_inside_the_handler() {
        let (tx, rx) = mpsc::channel();
        let slot: Arc<Mutex<Option<DataTask>>> = Arc::default();
        let seen = slot.clone();
        let task = DataTask::new(
            HttpRequest::get("http://localhost"),
            Box::new(move |_| {
                let state = seen.lock().as_ref().map(DataTask::state);
                tx.send(state).unwrap();
            }),
        );
        *slot.lock() = Some(task.clone());
        task.resume();
        task.complete(ok_outcome());
        assert_eq!(rx.try_recv().unwrap(), Some(TaskState::Completed));
        slot.lock().take();
    }

    #[test]
    fn silent_cancel_never_calls_handler() {
        let (task, rx) = recording_task();
        let task = task.with_cancel_behavior(CancelBehavior::Silent);
        task.resume();
        task.cancel();
        task.complete(ok_outcome());
        assert_eq!(task.state(), TaskState::Completed);
        assert!(matches!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected)));
    }

    #[test]
    fn cancel_after_completion_is_ignored() {
        let (task, rx) = recording_task();
        task.resume();
        task.complete(ok_outcome());
        task.cancel();
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(rx.try_iter().count(), 1);
    }
}
