//! Service configuration loading and validation.
//!
//! Reads `agent-router.yaml` and resolves environment variables. The config
//! file is the single source of truth for the classifier endpoint, tool
//! backends, the manifest location and the HTTP bind address.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "agent-router.yaml";

/// Environment variable that points at the config file.
pub const CONFIG_ENV_VAR: &str = "AGENT_ROUTER_CONFIG";

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Fatal configuration errors. Surfaced at startup, never per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find {CONFIG_FILE_NAME} (set {CONFIG_ENV_VAR} or pass --config)")]
    NotFound,

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `agent-router.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Path to the tool manifest (JSON). Relative paths resolve against the
    /// directory holding the config file.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            manifest_path: default_manifest_path(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Chat-completions endpoint used for intent classification.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,
    /// Bearer token. Empty means "not configured".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    /// Kept low so identical prompts almost always classify the same way.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Ceiling for the selection object the model emits.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_base_url(),
            api_key: String::new(),
            model: default_classifier_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ClassifierConfig {
    /// The API key, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

/// Per-tool backend settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub sql: SqlConfig,
    #[serde(default)]
    pub launches: LaunchesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// OpenWeatherMap unit system: `imperial`, `metric` or `standard`.
    #[serde(default = "default_weather_units")]
    pub units: String,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_weather_base_url(),
            units: default_weather_units(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Seed the sample users on startup.
    #[serde(default = "default_true")]
    pub seed: bool,
    /// When set, `DELETE` statements need a matching `security_password`.
    #[serde(default)]
    pub delete_password: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            seed: true,
            delete_password: String::new(),
        }
    }
}

impl SqlConfig {
    pub fn delete_password(&self) -> Option<&str> {
        non_empty(&self.delete_password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchesConfig {
    #[serde(default = "default_launches_base_url")]
    pub base_url: String,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LaunchesConfig {
    fn default() -> Self {
        Self {
            base_url: default_launches_base_url(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for `agent-router.log`. Logs go to stderr when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("manifest.json")
}
fn default_classifier_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_classifier_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    200
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}
fn default_weather_units() -> String {
    "imperial".to_string()
}
fn default_tool_timeout_secs() -> u64 {
    10
}
fn default_database_path() -> PathBuf {
    PathBuf::from("db/test.db")
}
fn default_launches_base_url() -> String {
    "https://api.spacexdata.com/v3".to_string()
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_true() -> bool {
    true
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Resolution order: explicit path, `AGENT_ROUTER_CONFIG`, then a walk upward
/// from `start` looking for `agent-router.yaml`.
pub fn find_config_path(explicit: Option<&Path>, start: &Path) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(expand_tilde(&path));
        if candidate.exists() {
            return Ok(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_ENV_VAR} points at a missing file");
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(ConfigError::NotFound)
}

/// Load and parse the config file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}`, then resolves relative paths against the config
/// file's directory.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut config = parse_config(&raw).map_err(|reason| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    config.validate()?;

    Ok(config)
}

/// Parse config text (after interpolation). Paths are left as written.
pub fn parse_config(raw: &str) -> Result<AppConfig, String> {
    let interpolated = interpolate_env_vars(raw);
    // An empty document is a valid "all defaults" config.
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| e.to_string())
}

impl AppConfig {
    /// Make relative paths absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.manifest_path = resolve_against(base, &self.manifest_path);
        self.tools.sql.database_path = resolve_against(base, &self.tools.sql.database_path);
        if let Some(dir) = self.logging.dir.take() {
            self.logging.dir = Some(resolve_against(base, &dir));
        }
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.classifier.temperature) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "classifier.temperature must be within 0.0..=2.0, got {}",
                    self.classifier.temperature
                ),
            });
        }
        if self.classifier.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                reason: "classifier.max_tokens must be greater than zero".into(),
            });
        }
        if self.classifier.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "classifier.base_url must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_tilde(&path.to_string_lossy()));
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
///
/// An unset or empty variable takes the default, matching shell semantics.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        match std::env::var(var_name) {
            Ok(value) if !value.is_empty() => value,
            _ => expand_tilde(default),
        }
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
