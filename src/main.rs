//! agent-router binary: HTTP server plus one-shot CLI entry points.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use agent_router::config::{self, AppConfig, ConfigError};
use agent_router::tools::ToolCatalog;
use agent_router::{api, build_app_state, init_tracing, open_users_database};

/// Routes natural-language requests to backend tools via an LLM classifier
#[derive(Parser)]
#[command(name = "agent-router")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to the nearest agent-router.yaml)
    #[arg(short, long, global = true, env = config::CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Listen address, overrides `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run one request through the orchestrator and print the result as JSON
    Query {
        /// The natural-language request
        text: String,
        /// Password required for DELETE statements
        #[arg(long)]
        security_password: Option<String>,
    },
    /// Create and seed the users database, then list its rows
    InitDb,
    /// Print the tool catalog
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid listen address '{bind}'"))?;
            let state = build_app_state(&config)?;
            api::serve(state, addr).await?;
        }
        Command::Query {
            text,
            security_password,
        } => {
            let state = build_app_state(&config)?;
            let result = state
                .orchestrator
                .process_query(&text, security_password.as_deref())
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::InitDb => {
            let db = open_users_database(&config.tools.sql)?;
            let users = db.list_users()?;
            println!(
                "{} user(s) in {}",
                users.len(),
                config.tools.sql.database_path.display()
            );
            for user in users {
                println!(
                    "  {:>3}  {:<16} {:<28} {}",
                    user.id, user.name, user.email, user.created_at
                );
            }
        }
        Command::Tools => {
            let catalog = ToolCatalog::load(&config.manifest_path)?;
            for spec in catalog.iter() {
                println!("{}: {}", spec.name, spec.description);
                for (name, param) in &spec.parameters {
                    let required = if param.required { ", required" } else { "" };
                    println!("    {name} ({}{required})", param.param_type);
                }
            }
        }
    }

    Ok(())
}

/// Load the config file if one can be found. Without an explicit path a
/// missing file falls back to defaults rooted at the working directory.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    match config::find_config_path(explicit, &cwd) {
        Ok(path) => Ok(config::load_config(&path)?),
        Err(ConfigError::NotFound) if explicit.is_none() => {
            let mut config = AppConfig::default();
            config.resolve_paths(&cwd);
            Ok(config)
        }
        Err(e) => bail!(e),
    }
}
