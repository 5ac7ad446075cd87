//! Agent Core error types.
//!
//! Every variant is an instruction-level failure. The orchestrator catches
//! them at the instruction boundary and renders `to_string()` into the
//! outcome's `error` field, so the messages are what callers see.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that end a single instruction's pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The instruction text was empty or whitespace.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The classifier call failed (transport, auth, timeout, bad envelope).
    #[error("classifier unavailable: {reason}")]
    ClassifierUnavailable { reason: String },

    /// The classifier answered, but not with a decodable selection object.
    #[error("failed to parse classifier response as JSON: {reason} (raw response: {raw_response})")]
    MalformedClassifierOutput { raw_response: String, reason: String },

    /// The classifier chose no tool and the fallback did not apply.
    #[error("No suitable tool found for this request")]
    NoToolMatched,

    /// The delete-user fallback applied but no name could be recovered.
    #[error("Could not extract user name from prompt.")]
    NoNameExtracted,

    /// The selected tool is not in the catalog or has no implementation.
    #[error("unknown tool: '{name}'")]
    UnknownTool { name: String },

    /// A parameter the catalog marks as required is absent.
    #[error("missing required parameter '{param}' for tool '{tool}'")]
    MissingParameter { tool: String, param: String },
}

impl From<InferenceError> for AgentError {
    fn from(e: InferenceError) -> Self {
        AgentError::ClassifierUnavailable {
            reason: e.to_string(),
        }
    }
}
