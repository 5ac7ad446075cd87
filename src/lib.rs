pub mod agent_core;
pub mod api;
pub mod config;
pub mod inference;
pub mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use agent_core::Orchestrator;
use api::AppState;
use config::{AppConfig, LoggingConfig, SqlConfig};
use inference::{InferenceClient, IntentClassifier};
use tools::{ToolCatalog, ToolError, ToolSet, UsersDatabase};

/// Default `EnvFilter` directive when neither `RUST_LOG` nor
/// `logging.filter` is set.
const DEFAULT_LOG_FILTER: &str = "agent_router=info,warn";

/// Log file name inside `logging.dir`.
const LOG_FILE_NAME: &str = "agent-router.log";

/// Number of rotated log files kept.
const LOG_FILES_KEPT: u32 = 3;

// ─── Tracing ────────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber.
///
/// With `logging.dir` set:
/// 1. Rotates existing logs (agent-router.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh log file with a line-flushing writer.
/// 3. Logs a startup banner with the log path.
///
/// Without it, logs go to stderr. `logging.json` switches to JSON lines.
/// Calling this twice is a no-op.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let default_filter = logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let log_path = logging.dir.as_deref().map(|dir| dir.join(LOG_FILE_NAME));
    let file_writer = log_path.as_deref().and_then(|path| match open_log_file(path) {
        Ok(file) => Some(FlushingWriter::new(file)),
        Err(e) => {
            eprintln!("cannot open {}: {e}; logging to stderr", path.display());
            None
        }
    });

    let (writer, ansi, log_file) = match file_writer {
        Some(w) => (BoxMakeWriter::new(w), false, log_path),
        None => (BoxMakeWriter::new(std::io::stderr), true, None),
    };

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(false);
    let initialized = if logging.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if initialized {
        let destination = log_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stderr".into());
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            log_file = %destination,
            pid = std::process::id(),
            "=== agent-router starting ==="
        );
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    rotate_log_file(path, LOG_FILES_KEPT);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

/// Rotate log files: `agent-router.log` → `.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write, so
/// each log line reaches disk even if the process is killed.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Bootstrap ──────────────────────────────────────────────────────────────

/// Open the users store and seed it if configured.
pub fn open_users_database(config: &SqlConfig) -> Result<UsersDatabase, ToolError> {
    let db = UsersDatabase::open(&config.database_path)?;
    if config.seed {
        db.seed_sample_users()?;
    }
    Ok(db)
}

/// Load the catalog, open the database, and wire the tools, classifier and
/// orchestrator together. Any failure here is fatal for the process.
pub fn build_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let catalog = Arc::new(
        ToolCatalog::load(&config.manifest_path).context("failed to load tool manifest")?,
    );

    let db = open_users_database(&config.tools.sql).with_context(|| {
        format!(
            "failed to open users database at {}",
            config.tools.sql.database_path.display()
        )
    })?;

    let tools = ToolSet::from_config(&config.tools, Arc::clone(&catalog), db.into_connection())
        .context("failed to build tools")?;

    let classifier = InferenceClient::from_config(config.classifier.clone())
        .context("failed to build classifier client")?;
    if !classifier.is_configured() {
        tracing::warn!("no classifier API key configured; every query will fail until one is set");
    }

    tracing::info!(
        model = %classifier.model(),
        tools = ?tools.names(),
        "tool set ready"
    );

    let orchestrator = Orchestrator::new(catalog, Arc::new(classifier), Arc::new(tools));

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        weather_key_configured: config.tools.weather.api_key().is_some(),
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
