//! HTTP API for vault management and sync control.
//!
//! # Endpoints
//!
//! - `GET /api/health`: Liveness plus a database round trip
//! - `GET|POST /api/vaults`, `GET|PUT|DELETE /api/vaults/{id}`
//! - `GET /api/vaults/{id}/stats`, `/hierarchy`, `/documents/unprocessed`
//! - `POST /api/sync/start`: Starts a manual sync, returns the run id at once
//! - `POST /api/sync/stop/{id}`: Marks an in-progress run as stopped
//! - `GET /api/sync/history`, `GET /api/sync/status`

mod response;
mod sync;
mod vaults;

pub use response::{ApiError, ApiResponse};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::db::{SyncRunRepository, TrackedItemRepository, VaultRepository};
use crate::remote::DocumentSource;
use crate::sync::SyncOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub vaults: VaultRepository,
    pub items: TrackedItemRepository,
    pub runs: SyncRunRepository,
    pub orchestrator: SyncOrchestrator,
}

impl AppState {
    pub fn new(pool: SqlitePool, source: Arc<dyn DocumentSource>, fetch_timeout: Duration) -> Self {
        Self {
            vaults: VaultRepository::new(pool.clone()),
            items: TrackedItemRepository::new(pool.clone()),
            runs: SyncRunRepository::new(pool.clone()),
            orchestrator: SyncOrchestrator::new(pool.clone(), source)
                .with_fetch_timeout(fetch_timeout),
            pool,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/vaults", get(vaults::list_vaults).post(vaults::create_vault))
        .route(
            "/vaults/{id}",
            get(vaults::get_vault)
                .put(vaults::update_vault)
                .delete(vaults::delete_vault),
        )
        .route("/vaults/{id}/stats", get(vaults::vault_stats))
        .route("/vaults/{id}/hierarchy", get(vaults::vault_hierarchy))
        .route(
            "/vaults/{id}/documents/unprocessed",
            get(vaults::unprocessed_documents),
        )
        .route("/sync/start", post(sync::start_sync))
        .route("/sync/stop/{id}", post(sync::stop_sync))
        .route("/sync/history", get(sync::history))
        .route("/sync/status", get(sync::status));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Starts a scheduled sync for every enabled vault once per `every`.
///
/// The first round runs one full interval after startup.
pub fn spawn_scheduler(orchestrator: SyncOrchestrator, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match orchestrator.start_scheduled().await {
                Ok(started) if !started.is_empty() => {
                    tracing::info!(runs = started.len(), "Scheduled syncs started");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Failed to start scheduled syncs"),
            }
        }
    })
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::ok(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                database: "connected",
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: Some(HealthResponse {
                        status: "error",
                        version: env!("CARGO_PKG_VERSION"),
                        database: "unavailable",
                    }),
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}
