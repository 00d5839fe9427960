//! PACS archive admin tool.
//!
//! Runs single archive operations against a SQLite database and prints the
//! result as JSON.

mod commands;
mod config;

use clap::Parser;

use config::AdminConfig;

#[cfg(feature = "sqlite")]
use std::sync::Arc;
#[cfg(feature = "sqlite")]
use tracing::info;

#[cfg(feature = "sqlite")]
use pacs_persistence::archive::ObjectArchiveAccess;
#[cfg(feature = "sqlite")]
use pacs_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so command output on stdout stays valid JSON.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pacs_admin={},pacs_persistence={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Creates and initializes a SQLite backend from the admin configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &AdminConfig) -> anyhow::Result<SqliteBackend> {
    info!(database = %config.database_url, "Opening SQLite archive");

    let backend_config = SqliteBackendConfig {
        max_connections: config.max_connections,
        ..Default::default()
    };

    let backend = SqliteBackend::with_config(&config.database_url, backend_config)?;
    backend.init_schema()?;

    Ok(backend)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    run(config).await
}

#[cfg(feature = "sqlite")]
async fn run(config: AdminConfig) -> anyhow::Result<()> {
    let backend = Arc::new(create_sqlite_backend(&config)?);
    let archive = ObjectArchiveAccess::new(backend.clone(), backend.schema());

    let output = commands::run(&archive, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn run(_config: AdminConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "pacs-admin requires the 'sqlite' feature. \
         Build with: cargo build -p pacs-admin --features sqlite"
    )
}
