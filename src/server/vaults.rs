use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::response::{ApiError, ApiResponse, ApiResult};
use super::AppState;
use crate::db::is_unique_violation;
use crate::models::{NewVault, TrackedItem, Vault, VaultStats};
use crate::sync::Node;

#[derive(Debug, Deserialize)]
pub struct UpdateVault {
    pub sync_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i64,
}

pub async fn list_vaults(State(state): State<AppState>) -> ApiResult<Vec<Vault>> {
    Ok(ApiResponse::ok(state.vaults.list().await?))
}

pub async fn get_vault(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Vault> {
    Ok(ApiResponse::ok(require_vault(&state, id).await?))
}

pub async fn create_vault(
    State(state): State<AppState>,
    Json(input): Json<NewVault>,
) -> Result<(StatusCode, Json<ApiResponse<Vault>>), ApiError> {
    if input.name.trim().is_empty() || input.local_path.trim().is_empty() {
        return Err(ApiError::bad_request("Name and local_path are required"));
    }

    match state.vaults.create(&input).await {
        Ok(vault) => {
            tracing::info!(vault_id = vault.id, name = %vault.name, "Vault created");
            Ok((
                StatusCode::CREATED,
                ApiResponse::with_message(vault, "Vault created"),
            ))
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::bad_request(format!(
            "A vault named '{}' already exists",
            input.name
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_vault(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateVault>,
) -> ApiResult<Vault> {
    if !state.vaults.set_sync_enabled(id, input.sync_enabled).await? {
        return Err(vault_not_found(id));
    }
    Ok(ApiResponse::with_message(
        require_vault(&state, id).await?,
        "Vault updated",
    ))
}

pub async fn delete_vault(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Deleted> {
    if !state.vaults.delete(id).await? {
        return Err(vault_not_found(id));
    }
    tracing::info!(vault_id = id, "Vault deleted");
    Ok(ApiResponse::with_message(Deleted { id }, "Vault deleted"))
}

pub async fn vault_stats(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<VaultStats> {
    Ok(ApiResponse::ok(state.orchestrator.get_sync_stats(id).await?))
}

pub async fn vault_hierarchy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Node<TrackedItem>>> {
    Ok(ApiResponse::ok(
        state.orchestrator.get_document_hierarchy(id).await?,
    ))
}

pub async fn unprocessed_documents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<TrackedItem>> {
    require_vault(&state, id).await?;
    Ok(ApiResponse::ok(state.items.list_unprocessed(id).await?))
}

async fn require_vault(state: &AppState, id: i64) -> Result<Vault, ApiError> {
    state
        .vaults
        .get_by_id(id)
        .await?
        .ok_or_else(|| vault_not_found(id))
}

fn vault_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Vault not found: {}", id))
}
