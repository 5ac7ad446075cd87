//! Tool capabilities: the backends the orchestrator dispatches to.
//!
//! Key concepts:
//! - **ToolCatalog**: the static manifest (names, descriptions, parameter
//!   schemas) that the classification prompt is rendered from
//! - **Tool**: one executable capability, looked up by name
//! - **ToolSet**: the registry of tool bodies. `execute(name, params)` always
//!   returns text; a failing body yields its error message as the result

pub mod catalog;
pub mod database;
pub mod errors;
pub mod launches;
pub mod sql;
pub mod system_info;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

pub use catalog::{ParamSpec, ToolCatalog, ToolSpec};
pub use database::UsersDatabase;
pub use errors::ToolError;

use crate::config::ToolsConfig;

/// Parameter mapping passed to a tool.
pub type Parameters = serde_json::Map<String, Value>;

/// A named backend capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name the classifier selects this tool by (e.g. `sql_tool`).
    fn name(&self) -> &str;

    /// Run the tool. Errors are rendered as text by [`ToolSet::execute`].
    async fn execute(&self, params: &Parameters) -> Result<String, ToolError>;
}

/// Text value of a parameter. Numbers and booleans are stringified; null and
/// blank strings count as absent.
pub fn param_text(params: &Parameters, name: &str) -> Option<String> {
    match params.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like [`param_text`], but missing values become a `MissingParameter` error.
pub fn require_param(params: &Parameters, tool: &str, name: &str) -> Result<String, ToolError> {
    param_text(params, name).ok_or_else(|| ToolError::MissingParameter {
        tool: tool.to_string(),
        param: name.to_string(),
    })
}

// ─── ToolSet ─────────────────────────────────────────────────────────────────

/// Registry of tool bodies, keyed by name in registration order.
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the four built-in tools from config.
    ///
    /// `conn` is the users store the SQL tool runs against. The system-info
    /// tool renders its tool listing from `catalog`.
    pub fn from_config(
        config: &ToolsConfig,
        catalog: Arc<ToolCatalog>,
        conn: rusqlite::Connection,
    ) -> Result<Self, ToolError> {
        let mut set = Self::new();
        set.register(Arc::new(weather::WeatherTool::new(config.weather.clone())?));
        set.register(Arc::new(sql::SqlTool::new(conn, config.sql.delete_password())));
        set.register(Arc::new(launches::LaunchesTool::new(config.launches.clone())?));
        set.register(Arc::new(system_info::SystemInfoTool::new(catalog)));
        Ok(set)
    }

    /// Register a tool. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name. Never fails: unknown names and tool errors
    /// come back as descriptive text.
    pub async fn execute(&self, name: &str, params: &Parameters) -> String {
        let Some(tool) = self.tools.get(name) else {
            return ToolError::UnknownTool {
                name: name.to_string(),
            }
            .to_string();
        };

        let start = std::time::Instant::now();
        match tool.execute(params).await {
            Ok(text) => {
                tracing::info!(
                    tool = %name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "tool executed"
                );
                text
            }
            Err(e) => {
                tracing::warn!(
                    tool = %name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "tool returned an error"
                );
                e.to_string()
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo_tool"
        }

        async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
            require_param(params, "echo_tool", "text")
        }
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_param_text() {
        let p = params(json!({"a": " Paris ", "b": 42, "c": null, "d": "", "e": true}));
        assert_eq!(param_text(&p, "a").as_deref(), Some("Paris"));
        assert_eq!(param_text(&p, "b").as_deref(), Some("42"));
        assert_eq!(param_text(&p, "c"), None);
        assert_eq!(param_text(&p, "d"), None);
        assert_eq!(param_text(&p, "e").as_deref(), Some("true"));
        assert_eq!(param_text(&p, "missing"), None);
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_name() {
        let mut set = ToolSet::new();
        set.register(Arc::new(EchoTool));
        assert!(set.contains("echo_tool"));

        let out = set.execute("echo_tool", &params(json!({"text": "hello"}))).await;
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_execute_renders_tool_errors_as_text() {
        let mut set = ToolSet::new();
        set.register(Arc::new(EchoTool));

        let out = set.execute("echo_tool", &Parameters::new()).await;
        assert_eq!(out, "Error: text parameter required for echo_tool");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let set = ToolSet::new();
        let out = set.execute("nope", &Parameters::new()).await;
        assert_eq!(out, "Error: Unknown tool 'nope'");
    }
}
