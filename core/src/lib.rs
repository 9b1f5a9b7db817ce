//! A substitutable HTTP data-task seam.
//!
//! # Overview
//! Code that needs to send HTTP requests depends on the `Session` trait
//! instead of a concrete client. Production wiring binds `ureq::Agent`
//! (see `SessionConfig::build_agent`); tests bind `MockSession`.
//!
//! # Design
//! - `Session::data_task` takes a fully formed `HttpRequest` and a boxed
//!   completion handler and returns a suspended `DataTask` immediately.
//! - The handler receives one `DataTaskResult`: body and response on
//!   success, a `SessionError` otherwise. `DataTask` guarantees it is
//!   delivered at most once.
//! - Each implementation owns its threading and its cancellation policy.
//!
//! ```
//! use session_core::{HttpRequest, MockReply, MockSession, Session};
//!
//! let session = MockSession::new();
//! session.push_reply(MockReply::status(200, "hello"));
//!
//! let (body, response) = session.data(&HttpRequest::get("http://example.test/")).unwrap();
//! assert_eq!(body, b"hello");
//! assert_eq!(response.status, 200);
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod session;
pub mod task;

pub use config::SessionConfig;
pub use error::SessionError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, UnknownMethod};
pub use mock::{MockReply, MockSession};
pub use session::Session;
pub use task::{CancelBehavior, CompletionHandler, DataTask, DataTaskResult, TaskState};
