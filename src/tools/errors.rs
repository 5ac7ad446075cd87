//! Tool error types.
//!
//! A tool body never fails a request. Its error is rendered with `Display`
//! and returned as the result text, so each variant's message is written for
//! the end user.

use thiserror::Error;

/// Errors raised while loading the tool catalog or running a tool body.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Manifest missing or malformed. Fatal at startup.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    /// SQLite rejected the statement or the store is unavailable.
    #[error("SQL Error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The SQL text is not exactly one statement.
    #[error("SQL Error: {reason}")]
    InvalidStatement { reason: String },

    /// A backend credential or setting is absent.
    #[error("Error: {what} not configured")]
    NotConfigured { what: String },

    /// A parameter the tool body needs was not supplied.
    #[error("Error: {param} parameter required for {tool}")]
    MissingParameter { tool: String, param: String },

    /// The caller is not allowed to run this statement.
    #[error("Error: {reason}")]
    PermissionDenied { reason: String },

    /// The outbound HTTP request could not be completed.
    #[error("Error fetching {context}: {reason}")]
    RequestFailed { context: String, reason: String },

    /// The remote API answered with a non-2xx status.
    #[error("API Error: {status}")]
    HttpError { status: u16 },

    /// The remote API answered 2xx with a body we could not interpret.
    #[error("Error parsing {context}: {reason}")]
    ResponseShape { context: String, reason: String },

    /// No tool body is registered under this name.
    #[error("Error: Unknown tool '{name}'")]
    UnknownTool { name: String },
}
