//! Shared types for the agent core.
//!
//! Tool selections produced by the classifier, and the outcome records
//! returned to callers for single instructions and whole requests.

use serde::{Deserialize, Serialize};

use super::errors::AgentError;
use crate::tools::Parameters;

// ─── Tool Selection ─────────────────────────────────────────────────────────

/// The classifier's decision for one instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSelection {
    /// A catalog tool name, or [`ToolSelection::NONE`].
    pub tool_name: String,
    pub parameters: Parameters,
}

impl ToolSelection {
    /// Sentinel tool name the classifier uses to decline.
    pub const NONE: &'static str = "none";

    /// Whether the classifier declined to pick a tool. Exact match only.
    pub fn is_none(&self) -> bool {
        self.tool_name == Self::NONE
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────────────

/// Result of running one instruction through the pipeline.
///
/// Success carries `result`; failure carries `error`. Fields are always
/// serialized so the response shape is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub success: bool,
    /// The instruction text this outcome belongs to.
    pub user_query: String,
    pub tool_selected: Option<String>,
    pub parameters: Option<Parameters>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl InstructionOutcome {
    pub fn succeeded(
        user_query: &str,
        tool_selected: impl Into<String>,
        parameters: Parameters,
        result: String,
    ) -> Self {
        Self {
            success: true,
            user_query: user_query.to_string(),
            tool_selected: Some(tool_selected.into()),
            parameters: Some(parameters),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(user_query: &str, error: &AgentError) -> Self {
        Self {
            success: false,
            user_query: user_query.to_string(),
            tool_selected: None,
            parameters: None,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// One numbered step of a multi-instruction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 1-based position of the instruction in the request.
    pub step: usize,
    #[serde(flatten)]
    pub outcome: InstructionOutcome,
}

/// The `result` field of an [`OrchestrationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeResult {
    /// Tool output of a single instruction.
    Text(String),
    /// Per-step outcomes of a multi-instruction request, in request order.
    Steps(Vec<StepOutcome>),
}

/// Error reported at the top level when any step of a request failed.
pub const STEPS_FAILED_MESSAGE: &str = "One or more steps failed. See results.";

/// The response for a whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub success: bool,
    /// The full request text as received.
    pub user_query: String,
    /// Always null for multi-instruction requests.
    pub tool_selected: Option<String>,
    /// Always null for multi-instruction requests.
    pub parameters: Option<Parameters>,
    pub result: Option<OutcomeResult>,
    pub error: Option<String>,
}

impl OrchestrationResult {
    /// Aggregate step outcomes. Success is the AND over all steps.
    pub fn from_steps(user_query: &str, steps: Vec<StepOutcome>) -> Self {
        let success = steps.iter().all(|s| s.outcome.success);
        Self {
            success,
            user_query: user_query.to_string(),
            tool_selected: None,
            parameters: None,
            result: Some(OutcomeResult::Steps(steps)),
            error: (!success).then(|| STEPS_FAILED_MESSAGE.to_string()),
        }
    }

    /// The step outcomes, if this is a multi-instruction result.
    pub fn steps(&self) -> Option<&[StepOutcome]> {
        match &self.result {
            Some(OutcomeResult::Steps(steps)) => Some(steps),
            _ => None,
        }
    }

    /// The tool output text, if this is a single-instruction result.
    pub fn text(&self) -> Option<&str> {
        match &self.result {
            Some(OutcomeResult::Text(text)) => Some(text),
            _ => None,
        }
    }
}

impl From<InstructionOutcome> for OrchestrationResult {
    fn from(outcome: InstructionOutcome) -> Self {
        Self {
            success: outcome.success,
            user_query: outcome.user_query,
            tool_selected: outcome.tool_selected,
            parameters: outcome.parameters,
            result: outcome.result.map(OutcomeResult::Text),
            error: outcome.error,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_none_is_exact() {
        let none = ToolSelection {
            tool_name: "none".into(),
            parameters: Parameters::new(),
        };
        let upper = ToolSelection {
            tool_name: "None".into(),
            parameters: Parameters::new(),
        };
        assert!(none.is_none());
        assert!(!upper.is_none());
    }

    #[test]
    fn test_step_outcome_flattens() {
        let step = StepOutcome {
            step: 2,
            outcome: InstructionOutcome::failed("list all users", &AgentError::NoToolMatched),
        };
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(
            value,
            json!({
                "step": 2,
                "success": false,
                "user_query": "list all users",
                "tool_selected": null,
                "parameters": null,
                "result": null,
                "error": "No suitable tool found for this request"
            })
        );
    }

    #[test]
    fn test_from_steps_aggregates_success() {
        let ok = InstructionOutcome::succeeded("a", "sql_tool", Parameters::new(), "done".into());
        let bad = InstructionOutcome::failed("b", &AgentError::NoToolMatched);

        let all_ok = OrchestrationResult::from_steps(
            "a. b",
            vec![
                StepOutcome {
                    step: 1,
                    outcome: ok.clone(),
                },
                StepOutcome {
                    step: 2,
                    outcome: ok.clone(),
                },
            ],
        );
        assert!(all_ok.success);
        assert!(all_ok.error.is_none());

        let mixed = OrchestrationResult::from_steps(
            "a. b",
            vec![
                StepOutcome {
                    step: 1,
                    outcome: ok,
                },
                StepOutcome {
                    step: 2,
                    outcome: bad,
                },
            ],
        );
        assert!(!mixed.success);
        assert_eq!(mixed.error.as_deref(), Some(STEPS_FAILED_MESSAGE));
        assert!(mixed.tool_selected.is_none());
        assert_eq!(mixed.steps().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_single_outcome_serializes_result_as_text() {
        let outcome = InstructionOutcome::succeeded(
            "weather in Paris",
            "weather_tool",
            json!({"location": "Paris"}).as_object().cloned().unwrap_or_default(),
            "Paris: 64°F".into(),
        );
        let result: OrchestrationResult = outcome.into();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["result"], "Paris: 64°F");
        assert_eq!(value["tool_selected"], "weather_tool");
        assert_eq!(value["parameters"]["location"], "Paris");
        assert!(value["error"].is_null());
    }
}
