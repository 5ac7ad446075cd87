//! Delete-user fallback for when the classifier declines to pick a tool.
//!
//! Only one request class is recovered: "delete user X" phrasings. The name
//! is pulled out with a pair of anchored patterns and turned into a single
//! `DELETE` statement for the SQL tool. Nothing else is inferred here.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::errors::AgentError;
use super::types::ToolSelection;
use crate::tools::Parameters;

/// Tool the synthesized deletion is dispatched to.
pub const FALLBACK_TOOL: &str = "sql_tool";

/// Label reported in `tool_selected` for a fallback dispatch.
pub const FALLBACK_LABEL: &str = "sql_tool (fallback)";

/// Name characters run until the first terminator: a period, a comma,
/// "with", "password", or end of text.
static USER_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)user(?: named)? ([A-Za-z .'-]+?)(?:\.|,| with| the security password| security password| password|$)",
    )
    .expect("static regex")
});

static DELETE_USER_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)delete(?: the)? user(?: named)? ([A-Za-z .'-]+?)(?:\.|,| with| the security password| security password| password|$)",
    )
    .expect("static regex")
});

/// Whether the text looks like a user-deletion request at all.
pub fn is_delete_user_request(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("delete") && lowered.contains("user")
}

/// Recover the target user name from a deletion request, unescaped.
pub fn extract_delete_target(text: &str) -> Option<String> {
    let captured = USER_NAMED
        .captures(text)
        .or_else(|| DELETE_USER_NAMED.captures(text))?
        .get(1)?
        .as_str();

    let name = captured
        .trim()
        .trim_end_matches(['.', ' ', ','])
        .to_string();
    (!name.is_empty()).then_some(name)
}

/// Double every single quote so the value is safe inside a SQL string literal.
pub fn escape_sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// The statement dispatched for a recovered name.
pub fn delete_user_statement(name: &str) -> String {
    format!("DELETE FROM users WHERE name = '{}'", escape_sql_literal(name))
}

/// Run the fallback for an instruction the classifier declined.
///
/// Returns `NoToolMatched` when the text is not a deletion request, and
/// `NoNameExtracted` when it is but no name can be recovered.
pub fn fallback_selection(instruction: &str) -> Result<ToolSelection, AgentError> {
    if !is_delete_user_request(instruction) {
        return Err(AgentError::NoToolMatched);
    }

    let name = extract_delete_target(instruction).ok_or(AgentError::NoNameExtracted)?;
    tracing::info!(user = %name, "recovered delete-user target via fallback");

    let mut parameters = Parameters::new();
    parameters.insert("sql_query".into(), Value::String(delete_user_statement(&name)));

    Ok(ToolSelection {
        tool_name: FALLBACK_TOOL.to_string(),
        parameters,
    })
}
