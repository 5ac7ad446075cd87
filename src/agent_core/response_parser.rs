//! Classifier reply parsing.
//!
//! Models often wrap JSON in a markdown fence even when told not to. The
//! fence is stripped, then the remainder must decode as exactly one JSON
//! object. A decode failure is never papered over with a default selection.

use serde_json::Value;

use super::errors::AgentError;
use super::types::ToolSelection;
use crate::tools::Parameters;

/// Strip a surrounding ```` ```json ```` / ```` ``` ```` fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse the classifier's raw reply into a [`ToolSelection`].
///
/// `tool` defaults to `"none"` and `parameters` to `{}` when absent.
pub fn parse_selection(raw: &str) -> Result<ToolSelection, AgentError> {
    let malformed = |reason: String| AgentError::MalformedClassifierOutput {
        raw_response: raw.to_string(),
        reason,
    };

    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(malformed("expected a JSON object".into()));
    };

    let tool_name = match object.remove("tool") {
        None | Some(Value::Null) => ToolSelection::NONE.to_string(),
        Some(Value::String(name)) => name.trim().to_string(),
        Some(other) => return Err(malformed(format!("\"tool\" must be a string, got {other}"))),
    };

    let parameters = match object.remove("parameters") {
        None | Some(Value::Null) => Parameters::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(malformed(format!("\"parameters\" must be an object, got {other}")))
        }
    };

    Ok(ToolSelection {
        tool_name,
        parameters,
    })
}
