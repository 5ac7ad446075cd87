//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the classifier model endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the model endpoint. `body` is for logs
    /// only and stays out of the message.
    #[error("HTTP {status} from model endpoint")]
    HttpError { status: u16, body: String },

    /// No API key configured for an endpoint that requires one.
    #[error("no API key configured for {endpoint}")]
    MissingApiKey { endpoint: String },

    /// The endpoint answered 2xx but the body was not a chat completion.
    #[error("unexpected completion response: {reason}")]
    ResponseParseError { reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Whether this error came from the credential check (missing key, 401, 403).
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            InferenceError::MissingApiKey { .. }
                | InferenceError::HttpError { status: 401 | 403, .. }
        )
    }
}
