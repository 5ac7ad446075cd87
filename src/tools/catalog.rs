//! Tool catalog: the static manifest of tools the classifier may choose from.
//!
//! Provides:
//! - Manifest loading and validation (`manifest.json`)
//! - Lookup by tool name
//! - Iteration in manifest order, which is the order tools appear in the
//!   classification prompt
//! - Required-parameter checks before dispatch

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::errors::ToolError;
use super::Parameters;

// ─── Manifest Types ──────────────────────────────────────────────────────────

/// Declared schema of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A tool as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Parameter name to schema, in declaration order.
    #[serde(default)]
    pub parameters: IndexMap<String, ParamSpec>,
}

impl ToolSpec {
    /// Whether the tool declares a parameter with this name.
    pub fn declares(&self, param: &str) -> bool {
        self.parameters.contains_key(param)
    }

    /// The first required parameter that is absent, null or an empty string.
    pub fn missing_required(&self, params: &Parameters) -> Option<&str> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .find(|name| match params.get(*name) {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    tools: Vec<ToolSpec>,
}

// ─── ToolCatalog ─────────────────────────────────────────────────────────────

/// Read-only set of tool specs, keyed by name, in manifest order.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: IndexMap<String, ToolSpec>,
}

impl ToolCatalog {
    /// Load the catalog from a manifest file.
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ToolError::ConfigError {
            reason: format!("failed to read manifest {}: {e}", path.display()),
        })?;
        let catalog = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            tool_count = catalog.len(),
            "loaded tool manifest"
        );
        Ok(catalog)
    }

    /// Parse a manifest document.
    pub fn from_json(raw: &str) -> Result<Self, ToolError> {
        let manifest: Manifest = serde_json::from_str(raw).map_err(|e| ToolError::ConfigError {
            reason: format!("invalid manifest JSON: {e}"),
        })?;
        Self::from_specs(manifest.tools)
    }

    /// Build a catalog from specs, rejecting empty or duplicate names.
    pub fn from_specs(specs: Vec<ToolSpec>) -> Result<Self, ToolError> {
        if specs.is_empty() {
            return Err(ToolError::ConfigError {
                reason: "manifest declares no tools".into(),
            });
        }

        let mut tools = IndexMap::with_capacity(specs.len());
        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(ToolError::ConfigError {
                    reason: "manifest contains a tool with an empty name".into(),
                });
            }
            if tools.contains_key(&spec.name) {
                return Err(ToolError::ConfigError {
                    reason: format!("duplicate tool name in manifest: '{}'", spec.name),
                });
            }
            tools.insert(spec.name.clone(), spec);
        }

        Ok(Self { tools })
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// All specs in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// All tool names in manifest order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
