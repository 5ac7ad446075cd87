//! Query orchestrator: split → classify → parse → dispatch.
//!
//! Pipeline per instruction:
//! 1. **Prompt**: render the catalog and instruction into a selection prompt
//! 2. **Classify**: one chat-completion call, no retries
//! 3. **Parse**: decode the reply into a tool selection
//! 4. **Dispatch**: run the selected tool, or the delete-user fallback when
//!    the classifier declined
//!
//! Every failure is caught at the instruction boundary and becomes a failed
//! outcome. A multi-instruction request runs its steps strictly in order and
//! a failed step never stops the ones after it.

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::errors::AgentError;
use super::fallback::{fallback_selection, FALLBACK_LABEL};
use super::prompt::build_selection_prompt;
use super::response_parser::parse_selection;
use super::splitter::split_instructions;
use super::types::{InstructionOutcome, OrchestrationResult, StepOutcome, ToolSelection};
use crate::inference::IntentClassifier;
use crate::tools::{param_text, Parameters, ToolCatalog, ToolSet};

/// Parameter carrying the caller-supplied confirmation for destructive SQL.
pub const SECURITY_PASSWORD_PARAM: &str = "security_password";

/// Placeholder reported in place of a dispatched password.
const REDACTED: &str = "********";

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Routes requests to tools. Holds only read-only shared state, so one
/// instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<ToolCatalog>,
    classifier: Arc<dyn IntentClassifier>,
    tools: Arc<ToolSet>,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        classifier: Arc<dyn IntentClassifier>,
        tools: Arc<ToolSet>,
    ) -> Self {
        for name in catalog.names() {
            if !tools.contains(name) {
                tracing::warn!(tool = %name, "orchestrator: catalog tool has no implementation");
            }
        }
        Self {
            catalog,
            classifier,
            tools,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &dyn IntentClassifier {
        self.classifier.as_ref()
    }

    /// Process a whole request.
    ///
    /// A request that splits into one instruction is processed with its
    /// original text; otherwise each instruction becomes a numbered step.
    pub async fn process_query(
        &self,
        query: &str,
        security_password: Option<&str>,
    ) -> OrchestrationResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("query", request_id = %request_id);

        async move {
            if query.trim().is_empty() {
                return OrchestrationResult::from(InstructionOutcome::failed(
                    query,
                    &AgentError::EmptyQuery,
                ));
            }

            let instructions = split_instructions(query);
            if instructions.len() <= 1 {
                let outcome = self.process_instruction(query, security_password).await;
                return OrchestrationResult::from(outcome);
            }

            tracing::info!(step_count = instructions.len(), "orchestrator: multi-step request");

            let mut steps = Vec::with_capacity(instructions.len());
            for (idx, instruction) in instructions.iter().enumerate() {
                let outcome = self.process_instruction(instruction, security_password).await;
                steps.push(StepOutcome {
                    step: idx + 1,
                    outcome,
                });
            }

            let result = OrchestrationResult::from_steps(query, steps);
            tracing::info!(success = result.success, "orchestrator: request complete");
            result
        }
        .instrument(span)
        .await
    }

    /// Run one instruction through the pipeline. Never fails; errors are
    /// reported in the outcome.
    pub async fn process_instruction(
        &self,
        instruction: &str,
        security_password: Option<&str>,
    ) -> InstructionOutcome {
        match self.run_pipeline(instruction, security_password).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "orchestrator: instruction failed");
                InstructionOutcome::failed(instruction, &e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        instruction: &str,
        security_password: Option<&str>,
    ) -> Result<InstructionOutcome, AgentError> {
        if instruction.trim().is_empty() {
            return Err(AgentError::EmptyQuery);
        }

        let prompt = build_selection_prompt(&self.catalog, instruction);
        let raw = self.classifier.classify(&prompt).await.map_err(|e| {
            if e.is_auth_error() {
                tracing::error!(error = %e, "orchestrator: classifier rejected credentials");
            } else {
                tracing::warn!(error = %e, "orchestrator: classifier call failed");
            }
            e
        })?;
        let selection = parse_selection(&raw)?;

        if selection.is_none() {
            tracing::info!("orchestrator: classifier selected no tool, trying fallback");
            let recovered = fallback_selection(instruction)?;
            return self
                .dispatch(instruction, FALLBACK_LABEL, recovered, security_password)
                .await;
        }

        tracing::info!(tool = %selection.tool_name, "orchestrator: tool selected");
        let label = selection.tool_name.clone();
        self.dispatch(instruction, &label, selection, security_password)
            .await
    }

    /// Validate the selection against the catalog and run the tool.
    async fn dispatch(
        &self,
        instruction: &str,
        label: &str,
        selection: ToolSelection,
        security_password: Option<&str>,
    ) -> Result<InstructionOutcome, AgentError> {
        let ToolSelection {
            tool_name,
            mut parameters,
        } = selection;

        let spec = self
            .catalog
            .get(&tool_name)
            .filter(|_| self.tools.contains(&tool_name))
            .ok_or_else(|| AgentError::UnknownTool {
                name: tool_name.clone(),
            })?;

        if let Some(password) = security_password.filter(|p| !p.is_empty()) {
            if spec.declares(SECURITY_PASSWORD_PARAM) {
                parameters.insert(
                    SECURITY_PASSWORD_PARAM.to_string(),
                    Value::String(password.to_string()),
                );
            }
        }

        if let Some(param) = spec.missing_required(&parameters) {
            return Err(AgentError::MissingParameter {
                tool: tool_name,
                param: param.to_string(),
            });
        }

        let result = self.tools.execute(&tool_name, &parameters).await;
        Ok(InstructionOutcome::succeeded(
            instruction,
            label,
            redact(parameters),
            result,
        ))
    }
}

/// Mask the security password before parameters are echoed to the caller.
fn redact(mut parameters: Parameters) -> Parameters {
    if param_text(&parameters, SECURITY_PASSWORD_PARAM).is_some() {
        parameters.insert(
            SECURITY_PASSWORD_PARAM.to_string(),
            Value::String(REDACTED.to_string()),
        );
    }
    parameters
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agent_core::types::OutcomeResult;
    use crate::inference::InferenceError;
    use crate::tools::{Tool, ToolError};

    /// Classifier double: replays canned replies in order and records prompts.
    struct ScriptedClassifier {
        replies: Mutex<VecDeque<Result<String, InferenceError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClassifier {
        fn new(replies: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn replying(replies: &[&str]) -> Arc<Self> {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IntentClassifier for ScriptedClassifier {
        async fn classify(&self, prompt: &str) -> Result<String, InferenceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"tool": "none", "parameters": {}}"#.to_string()))
        }
    }

    /// Tool double: records every parameter mapping it receives.
    struct RecordingTool {
        name: &'static str,
        calls: Mutex<Vec<Parameters>>,
        fail_with: Option<&'static str>,
    }

    impl RecordingTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: Mutex::new(Vec::new()),
                fail_with: None,
            })
        }

        fn failing(name: &'static str, reason: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: Mutex::new(Vec::new()),
                fail_with: Some(reason),
            })
        }

        fn calls(&self) -> Vec<Parameters> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
            self.calls.lock().unwrap().push(params.clone());
            match self.fail_with {
                Some(reason) => Err(ToolError::PermissionDenied {
                    reason: reason.to_string(),
                }),
                None => Ok(format!("{} ok", self.name)),
            }
        }
    }

    fn catalog() -> Arc<ToolCatalog> {
        Arc::new(
            ToolCatalog::from_json(
                r#"{"tools": [
                    {"name": "weather_tool", "description": "Current weather",
                     "parameters": {"location": {"type": "string", "required": true}}},
                    {"name": "sql_tool", "description": "Run SQL on the users database",
                     "parameters": {"sql_query": {"type": "string", "required": true},
                                    "security_password": {"type": "string"}}},
                    {"name": "graphql_tool", "description": "SpaceX data",
                     "parameters": {"query": {"type": "string"}}},
                    {"name": "system_info_tool", "description": "About this system",
                     "parameters": {"query": {"type": "string"}}}
                ]}"#,
            )
            .unwrap(),
        )
    }

    struct Harness {
        orchestrator: Orchestrator,
        classifier: Arc<ScriptedClassifier>,
        weather: Arc<RecordingTool>,
        sql: Arc<RecordingTool>,
    }

    fn harness(classifier: Arc<ScriptedClassifier>) -> Harness {
        harness_with_sql(classifier, RecordingTool::new("sql_tool"))
    }

    fn harness_with_sql(classifier: Arc<ScriptedClassifier>, sql: Arc<RecordingTool>) -> Harness {
        let weather = RecordingTool::new("weather_tool");
        let mut tools = ToolSet::new();
        tools.register(weather.clone());
        tools.register(sql.clone());
        tools.register(RecordingTool::new("graphql_tool"));
        tools.register(RecordingTool::new("system_info_tool"));

        Harness {
            orchestrator: Orchestrator::new(catalog(), classifier.clone(), Arc::new(tools)),
            classifier,
            weather,
            sql,
        }
    }

    #[tokio::test]
    async fn test_no_tool_and_no_fallback() {
        let h = harness(ScriptedClassifier::replying(&[r#"{"tool": "none", "parameters": {}}"#]));
        let result = h.orchestrator.process_query("sing me a song", None).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No suitable tool found for this request"));
        assert!(result.result.is_none());
        assert!(result.tool_selected.is_none());
    }

    #[tokio::test]
    async fn test_direct_sql_dispatch() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "sql_tool", "parameters": {"sql_query": "SELECT * FROM users"}}"#,
        ]));
        let result = h.orchestrator.process_query("show all users", None).await;

        assert!(result.success);
        assert_eq!(result.tool_selected.as_deref(), Some("sql_tool"));
        assert_eq!(result.text(), Some("sql_tool ok"));
        let calls = h.sql.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["sql_query"], "SELECT * FROM users");

        let prompts = h.classifier.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User query: \"show all users\""));
    }

    #[tokio::test]
    async fn test_delete_fallback() {
        let h = harness(ScriptedClassifier::replying(&[r#"{"tool":"none","parameters":{}}"#]));
        let result = h.orchestrator.process_query("delete user Michael Scott", None).await;

        assert!(result.success);
        assert_eq!(result.tool_selected.as_deref(), Some("sql_tool (fallback)"));
        assert!(result.tool_selected.as_deref().is_some_and(|t| t.ends_with("(fallback)")));
        assert_eq!(
            h.sql.calls()[0]["sql_query"],
            "DELETE FROM users WHERE name = 'Michael Scott'"
        );
    }

    #[tokio::test]
    async fn test_fallback_escapes_apostrophe() {
        let h = harness(ScriptedClassifier::replying(&[r#"{"tool":"none","parameters":{}}"#]));
        h.orchestrator.process_query("delete user Conan O'Brien", None).await;

        assert_eq!(
            h.sql.calls()[0]["sql_query"],
            "DELETE FROM users WHERE name = 'Conan O''Brien'"
        );
    }

    #[tokio::test]
    async fn test_fallback_without_name() {
        let h = harness(ScriptedClassifier::replying(&[r#"{"tool":"none","parameters":{}}"#]));
        let result = h.orchestrator.process_query("delete a user", None).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Could not extract user name from prompt."));
        assert!(h.sql.calls().is_empty());
    }

    #[tokio::test]
    async fn test_two_instructions_run_in_order() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "weather_tool", "parameters": {"location": "Paris"}}"#,
            r#"{"tool": "sql_tool", "parameters": {"sql_query": "SELECT * FROM users"}}"#,
        ]));
        let query = "Show the weather in Paris. Then list all users";
        let result = h.orchestrator.process_query(query, None).await;

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.user_query, query);
        assert!(result.tool_selected.is_none());
        assert!(result.parameters.is_none());

        let steps = result.steps().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step, 1);
        assert_eq!(steps[0].outcome.user_query, "Show the weather in Paris.");
        assert_eq!(steps[0].outcome.tool_selected.as_deref(), Some("weather_tool"));
        assert_eq!(steps[1].step, 2);
        assert_eq!(steps[1].outcome.user_query, "Then list all users");

        let prompts = h.classifier.prompts();
        assert!(prompts[0].contains("\"Show the weather in Paris.\""));
        assert!(prompts[1].contains("\"Then list all users\""));
        assert_eq!(h.weather.calls().len(), 1);
        assert_eq!(h.sql.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_on_middle_step() {
        let classifier = ScriptedClassifier::new(vec![
            Ok(r#"{"tool": "weather_tool", "parameters": {"location": "Oslo"}}"#.to_string()),
            Err(InferenceError::HttpError {
                status: 503,
                body: "overloaded".into(),
            }),
            Ok(r#"{"tool": "system_info_tool", "parameters": {"query": "tools"}}"#.to_string()),
        ]);
        let h = harness(classifier);
        let result = h
            .orchestrator
            .process_query("weather in Oslo; count users; what tools exist", None)
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("One or more steps failed. See results."));

        let steps = result.steps().unwrap();
        assert_eq!(steps.len(), 3);
        assert!(steps[0].outcome.success);
        assert!(!steps[1].outcome.success);
        assert!(steps[1]
            .outcome
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("classifier unavailable")));
        assert_eq!(
            steps[1].outcome.error.as_deref(),
            Some("classifier unavailable: HTTP 503 from model endpoint"),
            "upstream body must not reach the caller"
        );
        assert!(steps[2].outcome.success);
        assert_eq!(steps[2].outcome.result.as_deref(), Some("system_info_tool ok"));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let h = harness(ScriptedClassifier::replying(&["The weather tool, probably."]));
        let result = h.orchestrator.process_query("weather in Rome", None).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("JSON"));
        assert!(error.contains("The weather tool, probably."));
        assert!(h.weather.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "email_tool", "parameters": {"to": "bob"}}"#,
        ]));
        let result = h.orchestrator.process_query("email bob", None).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unknown tool: 'email_tool'"));
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "weather_tool", "parameters": {}}"#,
        ]));
        let result = h.orchestrator.process_query("what's the weather", None).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("missing required parameter 'location' for tool 'weather_tool'")
        );
        assert!(h.weather.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_skips_classifier() {
        let h = harness(ScriptedClassifier::replying(&[]));
        let result = h.orchestrator.process_query("   ", None).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("query must not be empty"));
        assert!(h.classifier.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_tool_error_is_embedded_text() {
        let classifier = ScriptedClassifier::replying(&[
            r#"{"tool": "sql_tool", "parameters": {"sql_query": "DELETE FROM users"}}"#,
        ]);
        let h = harness_with_sql(classifier, RecordingTool::failing("sql_tool", "denied"));
        let result = h.orchestrator.process_query("delete everyone", None).await;

        assert!(result.success);
        assert_eq!(result.result, Some(OutcomeResult::Text("Error: denied".into())));
    }

    #[tokio::test]
    async fn test_security_password_injected_and_redacted() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "sql_tool", "parameters": {"sql_query": "DELETE FROM users WHERE name = 'Bob Smith'", "security_password": "your_password"}}"#,
            r#"{"tool":"none","parameters":{}}"#,
        ]));

        let result = h
            .orchestrator
            .process_query("remove Bob Smith from the database", Some("s3cret"))
            .await;
        assert_eq!(h.sql.calls()[0]["security_password"], "s3cret");
        assert_eq!(
            result.parameters.as_ref().map(|p| p["security_password"].clone()),
            Some(json!(REDACTED))
        );

        // The fallback path gets the password too.
        h.orchestrator
            .process_query("delete user Eva Brown", Some("s3cret"))
            .await;
        assert_eq!(h.sql.calls()[1]["security_password"], "s3cret");
    }

    #[tokio::test]
    async fn test_password_not_injected_into_undeclaring_tool() {
        let h = harness(ScriptedClassifier::replying(&[
            r#"{"tool": "weather_tool", "parameters": {"location": "Lima"}}"#,
        ]));
        h.orchestrator.process_query("weather in Lima", Some("s3cret")).await;
        assert!(!h.weather.calls()[0].contains_key(SECURITY_PASSWORD_PARAM));
    }
}
