//! Remarkidian Server
//!
//! HTTP API for managing vaults and triggering syncs from the document
//! cloud. Syncs run as background tasks; their outcome is read from the
//! sync ledger.
//!
//! # Configuration
//!
//! Settings come from the YAML config file (see `remarkidian config show`),
//! overridden by environment variables:
//! - `REMARKIDIAN_CONFIG`: Path to config file
//! - `REMARKIDIAN_PORT`: Port to listen on (default: 5000)
//! - `REMARKIDIAN_DATABASE_PATH`: SQLite database location
//! - `REMARKIDIAN_DEVICE_TOKEN`: Device token for the document cloud
//!
//! Setting `server.sync_interval_secs` enables scheduled syncs of every
//! vault with sync enabled.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use remarkidian::server::{router, spawn_scheduler, AppState};
use remarkidian::{init_db, Config, RemarkableClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remarkidian=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("REMARKIDIAN_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path)?;

    if let Some(path) = &config.config_file {
        tracing::info!("Config file: {}", path.display());
    }
    tracing::info!("Database: {}", config.database_path.value.display());
    if !config.remote.is_configured() {
        tracing::warn!("No device token configured - syncs will be rejected");
    }

    let pool = init_db(&config.database_path.value).await?;
    let client = RemarkableClient::from_config(&config.remote)?;
    let state = AppState::new(
        pool,
        Arc::new(client),
        Duration::from_secs(config.remote.timeout_secs),
    );

    if let Some(secs) = config.server.sync_interval_secs.filter(|s| *s > 0) {
        tracing::info!("Scheduled sync every {}s", secs);
        spawn_scheduler(state.orchestrator.clone(), Duration::from_secs(secs));
    }

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
