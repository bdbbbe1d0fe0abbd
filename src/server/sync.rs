use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::{ApiError, ApiResponse, ApiResult};
use super::AppState;
use crate::models::{SyncKind, SyncRun};

const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct StartSyncRequest {
    pub vault_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StartSyncResponse {
    pub sync_run_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub vault_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VaultSyncState {
    pub vault_id: i64,
    pub vault_name: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_run: Option<SyncRun>,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub active: Vec<SyncRun>,
    pub vaults: Vec<VaultSyncState>,
}

/// Starts a manual sync and returns without waiting for it.
pub async fn start_sync(
    State(state): State<AppState>,
    Json(request): Json<StartSyncRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StartSyncResponse>>), ApiError> {
    let vault_id = request
        .vault_id
        .ok_or_else(|| ApiError::bad_request("vault_id is required"))?;

    let sync_run_id = state
        .orchestrator
        .start_sync(vault_id, SyncKind::Manual)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::with_message(StartSyncResponse { sync_run_id }, "Sync started"),
    ))
}

pub async fn stop_sync(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<SyncRun> {
    let run = state.orchestrator.stop_sync(id).await?;
    Ok(ApiResponse::with_message(run, "Sync stopped"))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<SyncRun>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(0);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(ApiResponse::ok(
        state.runs.history(query.vault_id, limit, offset).await?,
    ))
}

/// Runs in progress plus the latest run of every vault.
pub async fn status(State(state): State<AppState>) -> ApiResult<SyncStatusResponse> {
    let active = state.runs.list_active().await?;

    let mut vaults = Vec::new();
    for vault in state.vaults.list().await? {
        vaults.push(VaultSyncState {
            last_run: state.runs.latest_for_vault(vault.id).await?,
            vault_id: vault.id,
            vault_name: vault.name,
            last_synced_at: vault.last_synced_at,
        });
    }

    Ok(ApiResponse::ok(SyncStatusResponse { active, vaults }))
}
