//! Route handlers and their request/response bodies.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::agent_core::OrchestrationResult;
use crate::tools::ToolSpec;

// ─── Models ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub security_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub classifier_key_configured: bool,
    pub weather_key_configured: bool,
    pub tool_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub message: String,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// Handler for GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Agent Router",
        description: "Routes natural-language requests to backend tools via an LLM classifier",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            EndpointInfo {
                method: "POST",
                path: "/query",
                description: "Process a natural-language request",
            },
            EndpointInfo {
                method: "GET",
                path: "/tools",
                description: "List available tools",
            },
            EndpointInfo {
                method: "GET",
                path: "/health",
                description: "Health check",
            },
        ],
    })
}

/// Handler for GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        classifier_key_configured: state.orchestrator.classifier().is_configured(),
        weather_key_configured: state.weather_key_configured,
        tool_count: state.orchestrator.catalog().len(),
    })
}

/// Handler for GET /tools
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        message: "Available tools".to_string(),
        tools: state.orchestrator.catalog().iter().cloned().collect(),
    })
}

/// Handler for POST /query
///
/// Always 200: failures are reported inside the orchestration result.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<OrchestrationResult> {
    let result = state
        .orchestrator
        .process_query(&request.query, request.security_password.as_deref())
        .await;
    Json(result)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
