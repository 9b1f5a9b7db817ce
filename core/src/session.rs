//! The `Session` trait: one substitutable entry point for "send this HTTP
//! request and tell me how it went".
//!
//! # Design
//! Calling code depends on `Session` (or `&dyn Session`) instead of a
//! concrete client, so production wiring binds `ureq::Agent` while tests
//! bind `MockSession`. The trait is dyn-compatible: the completion handler is
//! boxed rather than generic.

use std::sync::mpsc;

use crate::error::SessionError;
use crate::http::HttpRequest;
use crate::task::{CompletionHandler, DataTask, DataTaskResult};

pub trait Session: Send + Sync {
    /// Create a task for `request`. Returns immediately with a suspended
    /// task; nothing happens until `DataTask::resume` is called. The handler
    /// runs at most once, possibly on another thread.
    fn data_task(&self, request: &HttpRequest, completion_handler: CompletionHandler) -> DataTask;

    /// Run `request` to completion, blocking the current thread.
    ///
    /// An implementation that drops the handler without calling it (for
    /// example a silently cancelled task) yields `SessionError::Cancelled`.
    fn data(&self, request: &HttpRequest) -> DataTaskResult {
        let (tx, rx) = mpsc::channel();
        let task = self.data_task(
            request,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        task.resume();
        rx.recv().unwrap_or(Err(SessionError::Cancelled))
    }
}

impl<S: Session + ?Sized> Session for std::sync::Arc<S> {
    fn data_task(&self, request: &HttpRequest, completion_handler: CompletionHandler) -> DataTask {
        (**self).data_task(request, completion_handler)
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn data_task(&self, request: &HttpRequest, completion_handler: CompletionHandler) -> DataTask {
        (**self).data_task(request, completion_handler)
    }
}
