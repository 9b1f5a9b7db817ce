//! A `Session` that never touches the network.
//!
//! # Design
//! `MockSession` answers requests from a FIFO queue of canned replies and
//! falls back to a fixed reply once the queue is empty. Every request is
//! recorded so tests can assert on what the code under test sent. With no
//! delay configured a resumed task completes inline, on the resuming thread;
//! with a delay it completes on a worker thread, which leaves room to cancel
//! it first. Cancellation is silent by default: the handler is dropped and
//! never called.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::SessionError;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::Session;
use crate::task::{CancelBehavior, CompletionHandler, DataTask, DataTaskResult};

/// A canned answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Data { body: Vec<u8>, response: HttpResponse },
    Failure(SessionError),
}

impl MockReply {
    /// A reply with `status` and `body`; the response URL is filled in from
    /// the request when served.
    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        MockReply::Data {
            body: body.into(),
            response: HttpResponse::new(status, ""),
        }
    }

    pub fn failure(error: SessionError) -> Self {
        MockReply::Failure(error)
    }

    fn into_outcome(self, request: &HttpRequest) -> DataTaskResult {
        match self {
            MockReply::Data { body, mut response } => {
                if response.url.is_empty() {
                    response.url = request.url.clone();
                }
                Ok((body, response))
            }
            MockReply::Failure(error) => Err(error),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    replies: VecDeque<MockReply>,
    requests: Vec<HttpRequest>,
}

/// Test double for `Session`. Cheap to clone; clones share replies and the
/// request log.
#[derive(Debug, Clone)]
pub struct MockSession {
    state: Arc<Mutex<State>>,
    fallback: MockReply,
    delay: Option<Duration>,
    cancel_behavior: CancelBehavior,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            fallback: MockReply::status(404, Vec::new()),
            delay: None,
            cancel_behavior: CancelBehavior::Silent,
        }
    }

    /// Reply used once the queue runs dry.
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Complete tasks on a worker thread after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_cancel_behavior(mut self, behavior: CancelBehavior) -> Self {
        self.cancel_behavior = behavior;
        self
    }

    /// Queue a reply. Replies are served in the order they were pushed.
    pub fn push_reply(&self, reply: MockReply) {
        self.state.lock().replies.push_back(reply);
    }

    /// Requests seen so far, in `data_task` call order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of queued replies not yet served.
    pub fn pending(&self) -> usize {
        self.state.lock().replies.len()
    }

    fn next_reply(&self) -> MockReply {
        self.state
            .lock()
            .replies
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Session for MockSession {
    fn data_task(&self, request: &HttpRequest, completion_handler: CompletionHandler) -> DataTask {
        self.state.lock().requests.push(request.clone());
        let session = self.clone();
        let delay = self.delay;
        DataTask::new(request.clone(), completion_handler)
            .with_cancel_behavior(self.cancel_behavior)
            .on_resume(move |task| match delay {
                None => session.finish(&task),
                Some(delay) => {
                    let worker_task = task.clone();
                    let spawned = std::thread::Builder::new()
                        .name(format!("mock-task-{}", task.task_identifier()))
                        .spawn(move || {
                            std::thread::sleep(delay);
                            session.finish(&worker_task);
                        });
                    if let Err(e) = spawned {
                        warn!(task = task.task_identifier(), error = %e, "could not spawn mock worker");
                        task.complete(Err(SessionError::Transport(e.to_string())));
                    }
                }
            })
    }
}

impl MockSession {
    /// Replies are only consumed by tasks that get to finish; a cancelled
    /// task leaves the queue untouched.
    fn finish(&self, task: &DataTask) {
        if task.is_cancelled() {
            task.complete(Err(SessionError::Cancelled));
            return;
        }
        let outcome = self.next_reply().into_outcome(task.original_request());
        task.complete(outcome);
    }
}
