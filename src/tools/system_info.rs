//! `system_info_tool`: describes this service and the tools it exposes.

use std::sync::Arc;

use async_trait::async_trait;

use super::catalog::ToolCatalog;
use super::errors::ToolError;
use super::{param_text, Parameters, Tool};

pub const TOOL_NAME: &str = "system_info_tool";

const ARCHITECTURE: &str = "\
Agent Router Architecture

1. HTTP front door (axum)
   - POST /query accepts a natural-language request
   - GET /tools lists the tool catalog
   - GET /health reports readiness

2. Orchestrator
   - Splits the request into independent instructions
   - Runs one classification per instruction, in order
   - Dispatches each selection to a tool and collects step outcomes

3. Intent classifier
   - OpenAI-compatible chat-completions endpoint
   - Low sampling temperature for repeatable selections
   - Replies with a single JSON object: {\"tool\", \"parameters\"}

4. Tool catalog (manifest.json)
   - Tool names, descriptions and declared parameters
   - Rendered into every classification prompt

5. Tools
   - weather_tool: OpenWeatherMap REST API
   - sql_tool: local SQLite users database
   - graphql_tool: SpaceX REST API
   - system_info_tool: this description

Data flow:
request -> split -> classify -> parse -> dispatch -> outcome";

const CAPABILITIES: &str = "\
Agent Capabilities

- Understands free-form requests and picks the matching tool
- Extracts tool parameters (city names, SQL statements, search topics)
- Handles several instructions in one request, reporting each step separately
- Recovers user-deletion requests the classifier declines to route
- Reports tool failures as readable text instead of failing the request

Examples:
- \"What's the weather in Tokyo?\" -> weather_tool
- \"Show me all users\" -> sql_tool
- \"Tell me about SpaceX rockets\" -> graphql_tool
- \"What can you do?\" -> system_info_tool";

const OVERVIEW: &str = "\
Agent Router Overview

Routes natural-language requests to backend tools. A language model reads
the tool catalog, selects a tool and extracts its parameters; the router
then runs the tool and returns its result.

Components: axum HTTP API, chat-completions classifier, SQLite users
store, OpenWeatherMap and SpaceX API clients.

Ask about the available tools, the architecture, or what the agent can do
for more detail.";

/// Which description a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Tools,
    Architecture,
    Capabilities,
    Overview,
}

impl Topic {
    fn from_query(query: &str) -> Self {
        let lowered = query.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mentions = |keys: &[&str]| words.iter().any(|w| keys.iter().any(|k| w.starts_with(k)));

        if mentions(&["tool", "function", "available"]) {
            Topic::Tools
        } else if mentions(&["architecture", "how", "work"]) {
            Topic::Architecture
        } else if mentions(&["agent", "ai", "can", "capabilit"]) {
            Topic::Capabilities
        } else {
            Topic::Overview
        }
    }
}

pub struct SystemInfoTool {
    catalog: Arc<ToolCatalog>,
}

impl SystemInfoTool {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self { catalog }
    }

    fn tool_listing(&self) -> String {
        let mut out = String::from("Available Tools\n");
        for (idx, spec) in self.catalog.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n   {}\n", idx + 1, spec.name, spec.description));
            if !spec.parameters.is_empty() {
                let params: Vec<String> = spec
                    .parameters
                    .iter()
                    .map(|(name, p)| {
                        if p.required {
                            format!("{name} ({}, required)", p.param_type)
                        } else {
                            format!("{name} ({})", p.param_type)
                        }
                    })
                    .collect();
                out.push_str(&format!("   Parameters: {}\n", params.join(", ")));
            }
        }
        out.trim_end().to_string()
    }
}

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
        let query = param_text(params, "query").unwrap_or_default();
        Ok(match Topic::from_query(&query) {
            Topic::Tools => self.tool_listing(),
            Topic::Architecture => ARCHITECTURE.to_string(),
            Topic::Capabilities => CAPABILITIES.to_string(),
            Topic::Overview => OVERVIEW.to_string(),
        })
    }
}
