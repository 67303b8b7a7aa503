use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::accounting_error;
use crate::api::extract::AdminUser;
use crate::api::response::{ApiError, AppJson};
use crate::storage::models::Blacklist;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Moderation: blacklist a user. Their key stops authenticating but their
/// stored objects remain until deleted or wiped.
pub async fn blacklist_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<BlacklistRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let updated = state
        .db
        .set_blacklist(
            &id,
            Blacklist {
                status: true,
                reason: req.reason,
            },
        )
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !updated {
        return Err(ApiError::not_found("User not found."));
    }

    // A blacklisted account should not keep reclaiming storage on a timer
    state.scheduler.cancel(&id);

    tracing::info!(user_id = %id, admin = %admin.id, "blacklisted user");

    Ok(Json(MessageResponse {
        success: true,
        message: "User blacklisted successfully.".to_string(),
    }))
}

/// Admin delete by filename, without an ownership check.
pub async fn admin_delete_file(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let file = state
        .db
        .get_file(&filename)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found."))?;

    state
        .accounting
        .delete_file(&file)
        .await
        .map_err(accounting_error)?;

    tracing::info!(filename = %filename, admin = %admin.id, "admin deleted file");

    Ok(Json(MessageResponse {
        success: true,
        message: "File deleted successfully.".to_string(),
    }))
}
