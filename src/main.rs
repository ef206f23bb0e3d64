use anyhow::{Context, Result};
use std::sync::Arc;

use catalog_admin::catalog::CatalogClient;
use catalog_admin::cli::{App, Command};
use catalog_admin::config::{self, Config};
use catalog_admin::error::ApiError;
use catalog_admin::http_client::CatalogHttpClient;
use catalog_admin::session::{CredentialStore, SessionManager, SqliteStorage};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let message = e
            .downcast_ref::<ApiError>()
            .map(ApiError::user_message)
            .unwrap_or_else(|| format!("{:#}", e));
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Logs go to stderr so command output stays clean
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(
        backend = %config.backend_url,
        session_db = %config.session_db.display(),
        "Configuration loaded"
    );

    if let Command::Setup = command {
        return config::run_interactive_setup(&config);
    }

    let storage = SqliteStorage::open(&config.session_db)
        .with_context(|| format!("Failed to open session database {}", config.session_db.display()))?;
    let store = Arc::new(CredentialStore::open(Arc::new(storage)));

    let http_client = Arc::new(CatalogHttpClient::new(
        store,
        config.api_base.clone(),
        config.connect_timeout(),
        config.request_timeout(),
        config.refresh_timeout(),
    )?);

    let app = App::new(
        SessionManager::new(http_client.clone()),
        CatalogClient::new(http_client),
    );

    tokio::select! {
        result = app.run(command) => result,
        _ = interrupted() => {
            tracing::info!("Received Ctrl+C, abandoning command");
            anyhow::bail!("Interrupted")
        }
    }
}

/// Resolves on Ctrl+C. A failed handler install never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
