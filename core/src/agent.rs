//! `ureq::Agent` as the production `Session`.
//!
//! # Design
//! The agent conforms to `Session` directly, so production code passes an
//! agent wherever a session is expected and tests pass a `MockSession`.
//! Each resumed task runs on its own named worker thread because ureq is
//! blocking; the completion handler therefore runs on that worker.
//!
//! ureq cannot abort a request mid-flight. Cancelling a running task lets
//! the request finish and reports `SessionError::Cancelled` in place of
//! its result.

use std::io;

use tracing::warn;
use ureq::http;
use ureq::ResponseExt;

use crate::error::SessionError;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::Session;
use crate::task::{CancelBehavior, CompletionHandler, DataTask, DataTaskResult};

impl Session for ureq::Agent {
    fn data_task(&self, request: &HttpRequest, completion_handler: CompletionHandler) -> DataTask {
        let agent = self.clone();
        DataTask::new(request.clone(), completion_handler)
            .with_cancel_behavior(CancelBehavior::Report)
            .on_resume(move |task| spawn_worker(agent, task))
    }
}

fn spawn_worker(agent: ureq::Agent, task: DataTask) {
    let worker_task = task.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("session-task-{}", task.task_identifier()))
        .spawn(move || {
            if worker_task.is_cancelled() {
                worker_task.complete(Err(SessionError::Cancelled));
                return;
            }
            let outcome = execute(&agent, worker_task.original_request());
            worker_task.complete(outcome);
        });
    if let Err(e) = spawned {
        warn!(task = task.task_identifier(), error = %e, "could not spawn worker thread");
        task.complete(Err(SessionError::Transport(e.to_string())));
    }
}

/// Perform `request` on the current thread.
pub(crate) fn execute(agent: &ureq::Agent, request: &HttpRequest) -> DataTaskResult {
    match &request.body {
        Some(body) => send(agent, request, body.as_slice()),
        None => send(agent, request, ()),
    }
}

fn send<B: ureq::AsSendBody>(agent: &ureq::Agent, request: &HttpRequest, body: B) -> DataTaskResult {
    let uri: http::Uri = request
        .url
        .parse()
        .map_err(|e: http::uri::InvalidUri| SessionError::InvalidUrl(format!("{}: {e}", request.url)))?;

    let mut builder = http::Request::builder().method(request.method.as_str()).uri(uri);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let mut http_request = builder
        .body(body)
        .map_err(|e| SessionError::Transport(e.to_string()))?;

    if let Some(timeout) = request.timeout {
        http_request = agent
            .configure_request(http_request)
            .timeout_global(Some(timeout))
            .build();
    }

    let mut response = agent.run(http_request).map_err(map_error)?;

    // The final URI, after any redirects were followed.
    let mut meta = HttpResponse::new(response.status().as_u16(), &response.get_uri().to_string());
    for (name, value) in response.headers() {
        meta.headers
            .push((name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()));
    }
    // The whole body is handed over, so ureq's default read cap does not apply.
    let data = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(map_error)?;
    Ok((data, meta))
}

fn map_error(err: ureq::Error) -> SessionError {
    match err {
        ureq::Error::Timeout(_) => SessionError::Timeout,
        ureq::Error::BadUri(uri) => SessionError::InvalidUrl(uri),
        ureq::Error::HostNotFound => SessionError::ConnectionFailed("host not found".to_string()),
        ureq::Error::ConnectionFailed => SessionError::ConnectionFailed("connection failed".to_string()),
        ureq::Error::Io(e) => match e.kind() {
            io::ErrorKind::TimedOut => SessionError::Timeout,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset | io::ErrorKind::NotFound => {
                SessionError::ConnectionFailed(e.to_string())
            }
            _ => SessionError::Transport(e.to_string()),
        },
        other => SessionError::Transport(other.to_string()),
    }
}
