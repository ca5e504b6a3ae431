//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur while asking a vision backend to analyse a frame.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Model reply contained no decodable JSON object.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Backend response envelope doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Map a reqwest transport error, distinguishing timeouts.
    ///
    /// The request URL is stripped: error text ends up in persisted history.
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            AgentError::Timeout(timeout_ms)
        } else {
            AgentError::Network(e.without_url().to_string())
        }
    }
}
