//! Settings for the `ureq::Agent` binding.

use std::time::Duration;

/// Agent-wide settings. Per-request values on `HttpRequest` take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on a whole request, connect through body. `None` disables it.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// `0` turns redirect following off. When the limit is reached the last
    /// redirect response is delivered as data.
    pub max_redirects: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(60)),
            user_agent: concat!("session/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

impl SessionConfig {
    /// Build an agent that reports every HTTP status as data. Status codes
    /// are never turned into errors.
    pub fn build_agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .user_agent(self.user_agent.as_str())
            .max_redirects(self.max_redirects)
            .max_redirects_will_error(false)
            .build()
            .new_agent()
    }
}
