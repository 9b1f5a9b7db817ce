//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations: C
//! strings instead of `String`, pointer plus length instead of `Vec`, and
//! enums with explicit discriminants. `OwnedTaskResult` keeps the storage
//! behind an `FfiTaskResult` alive for the duration of a completion callback.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use session_core::{DataTask, DataTaskResult, HttpMethod, Session, SessionError, TaskState};

/// Opaque handle to a session. C callers receive a pointer to this and pass
/// it back into `session_data_task`.
pub struct FfiSession {
    pub(crate) inner: Box<dyn Session>,
}

/// Opaque handle to a data task. Freeing the handle does not cancel the task.
pub struct FfiDataTask {
    pub(crate) inner: DataTask,
}

/// Called once per task with a result that is only valid during the call.
/// The callback is the last user of `user_data`; it may free it.
pub type FfiCompletion = extern "C" fn(user_data: *mut c_void, result: *const FfiTaskResult);

/// Caller-supplied context pointer handed back to the completion callback.
/// The C caller is responsible for making it safe to use from the thread the
/// callback runs on.
pub(crate) struct UserData(pub(crate) *mut c_void);

unsafe impl Send for UserData {}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Head = 1,
    Post = 2,
    Put = 3,
    Patch = 4,
    Delete = 5,
    Options = 6,
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Head => HttpMethod::Head,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Patch => HttpMethod::Patch,
            FfiHttpMethod::Delete => HttpMethod::Delete,
            FfiHttpMethod::Options => HttpMethod::Options,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// Read `len` caller-owned headers. Entries with a null key or value are
/// skipped.
///
/// # Safety
/// `headers` must be null or point to `len` valid `FfiHeader` values whose
/// strings are NUL-terminated.
pub(crate) unsafe fn headers_from_c(headers: *const FfiHeader, len: u32) -> Vec<(String, String)> {
    if headers.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = unsafe { std::slice::from_raw_parts(headers, len as usize) };
    slice
        .iter()
        .filter(|h| !h.key.is_null() && !h.value.is_null())
        .map(|h| {
            let key = unsafe { CStr::from_ptr(h.key) }.to_string_lossy().into_owned();
            let value = unsafe { CStr::from_ptr(h.value) }.to_string_lossy().into_owned();
            (key, value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTaskState {
    Suspended = 0,
    Running = 1,
    Canceling = 2,
    Completed = 3,
}

impl From<TaskState> for FfiTaskState {
    fn from(s: TaskState) -> Self {
        match s {
            TaskState::Suspended => FfiTaskState::Suspended,
            TaskState::Running => FfiTaskState::Running,
            TaskState::Canceling => FfiTaskState::Canceling,
            TaskState::Completed => FfiTaskState::Completed,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiTaskResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Cancelled = 1,
    Timeout = 2,
    InvalidUrl = 3,
    ConnectionFailed = 4,
    Transport = 5,
}

impl From<&SessionError> for FfiErrorCode {
    fn from(e: &SessionError) -> Self {
        match e {
            SessionError::Cancelled => FfiErrorCode::Cancelled,
            SessionError::Timeout => FfiErrorCode::Timeout,
            SessionError::InvalidUrl(_) => FfiErrorCode::InvalidUrl,
            SessionError::ConnectionFailed(_) => FfiErrorCode::ConnectionFailed,
            SessionError::Transport(_) => FfiErrorCode::Transport,
        }
    }
}

/// Outcome handed to the completion callback.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `status`,
/// `headers` and `data` describe the response. On failure `error_code`
/// describes the category, `error_message` is a human-readable C string,
/// and every other pointer is null. Nothing here may be retained after the
/// callback returns.
#[repr(C)]
pub struct FfiTaskResult {
    pub error_code: FfiErrorCode,
    pub error_message: *const c_char,
    pub status: u16,
    pub headers: *const FfiHeader,
    pub headers_len: u32,
    pub data: *const u8,
    pub data_len: usize,
}

/// Backing storage for an `FfiTaskResult`.
pub(crate) struct OwnedTaskResult {
    error_code: FfiErrorCode,
    error_message: Option<CString>,
    status: u16,
    // Owns the strings `headers` points into.
    #[allow(dead_code)]
    header_strings: Vec<(CString, CString)>,
    headers: Vec<FfiHeader>,
    data: Vec<u8>,
}

impl OwnedTaskResult {
    pub(crate) fn from_outcome(outcome: DataTaskResult) -> Self {
        match outcome {
            Ok((data, response)) => {
                let header_strings: Vec<(CString, CString)> = response
                    .headers
                    .into_iter()
                    .map(|(k, v)| (c_string_lossy(k), c_string_lossy(v)))
                    .collect();
                let headers = header_strings
                    .iter()
                    .map(|(k, v)| FfiHeader {
                        key: k.as_ptr(),
                        value: v.as_ptr(),
                    })
                    .collect();
                Self {
                    error_code: FfiErrorCode::Ok,
                    error_message: None,
                    status: response.status,
                    header_strings,
                    headers,
                    data,
                }
            }
            Err(e) => Self {
                error_code: FfiErrorCode::from(&e),
                error_message: Some(c_string_lossy(e.to_string())),
                status: 0,
                header_strings: Vec::new(),
                headers: Vec::new(),
                data: Vec::new(),
            },
        }
    }

    /// Borrowing view; valid while `self` is alive and unmoved.
    pub(crate) fn as_ffi(&self) -> FfiTaskResult {
        let ok = self.error_code == FfiErrorCode::Ok;
        FfiTaskResult {
            error_code: self.error_code,
            error_message: self.error_message.as_ref().map_or(std::ptr::null(), |m| m.as_ptr()),
            status: self.status,
            headers: if self.headers.is_empty() {
                std::ptr::null()
            } else {
                self.headers.as_ptr()
            },
            headers_len: self.headers.len() as u32,
            data: if ok { self.data.as_ptr() } else { std::ptr::null() },
            data_len: self.data.len(),
        }
    }
}

/// Interior NUL bytes are stripped rather than failing the conversion.
fn c_string_lossy(s: String) -> CString {
    CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}
