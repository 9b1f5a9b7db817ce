//! C-ABI wrapper around `session-core`.
//!
//! # Overview
//! Exposes the `Session` seam through `extern "C"` functions so any language
//! with a C FFI can create data tasks, resume or cancel them, and receive
//! their outcome through a callback. The crate builds as both a static and a
//! dynamic library; `build.rs` writes a matching C header to `OUT_DIR`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The session behind `FfiSession` is a `ureq::Agent` built from
//!   `SessionConfig`; the completion callback runs on the task's worker
//!   thread.
//! - `FfiTaskResult` is borrowed by the callback and freed by Rust as soon as
//!   it returns, so there is no matching free function.
//! - The C caller owns every returned handle and must release it with the
//!   matching `*_free` function.

pub mod types;

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use session_core::{HttpRequest, SessionConfig};

use types::*;

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Create a session backed by the platform HTTP agent.
///
/// `timeout_ms` bounds each whole request; `0` disables the timeout.
/// Returns null if an internal panic occurs. The caller must free the
/// returned pointer with `session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn session_new(timeout_ms: u64) -> *mut FfiSession {
    catch_unwind(|| {
        let config = SessionConfig {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            ..SessionConfig::default()
        };
        let session = FfiSession {
            inner: Box::new(config.build_agent()),
        };
        Box::into_raw(Box::new(session))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session created by `session_new`. Safe to call with null.
/// Tasks already created from it keep running.
#[unsafe(no_mangle)]
pub extern "C" fn session_free(session: *mut FfiSession) {
    if !session.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(session) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Task creation
// ---------------------------------------------------------------------------

/// Create a suspended data task. Call `session_task_resume` to start it.
///
/// `headers` may be null when `headers_len` is 0; `body` may be null for no
/// body. `callback` is invoked exactly once with `user_data`, unless the
/// task is freed and never resumed. Returns null if `session`, `url` or
/// `callback` is null, or if `url` is not valid UTF-8.
///
/// `user_data` must stay valid until `callback` has returned. The task may
/// already read `Completed` from `session_task_state` while the callback is
/// still running, so release `user_data` from inside the callback, never
/// after polling the state.
/// The caller must free the returned pointer with `session_task_free`.
#[unsafe(no_mangle)]
pub extern "C" fn session_data_task(
    session: *const FfiSession,
    method: FfiHttpMethod,
    url: *const c_char,
    headers: *const FfiHeader,
    headers_len: u32,
    body: *const u8,
    body_len: usize,
    callback: Option<FfiCompletion>,
    user_data: *mut c_void,
) -> *mut FfiDataTask {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return std::ptr::null_mut();
        };
        if session.is_null() || url.is_null() {
            return std::ptr::null_mut();
        }
        let session = unsafe { &*session };
        let url = match unsafe { CStr::from_ptr(url) }.to_str() {
            Ok(u) => u,
            Err(_) => return std::ptr::null_mut(),
        };

        let mut request = HttpRequest::new(method.into(), url);
        request.headers = unsafe { headers_from_c(headers, headers_len) };
        if !body.is_null() {
            let bytes = unsafe { std::slice::from_raw_parts(body, body_len) };
            request.body = Some(bytes.to_vec());
        }

        let user_data = UserData(user_data);
        let task = session.inner.data_task(
            &request,
            Box::new(move |outcome| {
                let user_data = user_data;
                let owned = OwnedTaskResult::from_outcome(outcome);
                let view = owned.as_ffi();
                callback(user_data.0, &view);
            }),
        );
        Box::into_raw(Box::new(FfiDataTask { inner: task }))
    }))
    .unwrap_or_else(|_| {
        tracing::error!("panic in session_data_task");
        std::ptr::null_mut()
    })
}

// ---------------------------------------------------------------------------
// Task control
// ---------------------------------------------------------------------------

/// Start a suspended task. No effect on a task that already started or
/// finished, or on null.
#[unsafe(no_mangle)]
pub extern "C" fn session_task_resume(task: *const FfiDataTask) {
    if task.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*task }.inner.resume();
    }));
}

/// Cancel a task. A task that never started reports `Cancelled` through its
/// callback before this returns; a running task reports it when its request
/// finishes. No effect on a finished task, or on null.
#[unsafe(no_mangle)]
pub extern "C" fn session_task_cancel(task: *const FfiDataTask) {
    if task.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*task }.inner.cancel();
    }));
}

/// Current state of a task. A null task reads as `Completed`.
#[unsafe(no_mangle)]
pub extern "C" fn session_task_state(task: *const FfiDataTask) -> FfiTaskState {
    if task.is_null() {
        return FfiTaskState::Completed;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*task }.inner.state().into())).unwrap_or(FfiTaskState::Completed)
}

/// Process-wide identifier of a task, or 0 for null.
#[unsafe(no_mangle)]
pub extern "C" fn session_task_identifier(task: *const FfiDataTask) -> u64 {
    if task.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*task }.inner.task_identifier())).unwrap_or(0)
}

/// Free a task handle. Safe to call with null. A resumed task keeps running
/// and still invokes its callback.
#[unsafe(no_mangle)]
pub extern "C" fn session_task_free(task: *mut FfiDataTask) {
    if !task.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(task) });
        }));
    }
}
