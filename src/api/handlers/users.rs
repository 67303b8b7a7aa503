use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::extract::AuthUser;
use crate::api::response::{ApiError, AppJson};
use crate::storage::models::{AutoWipe, User};
use crate::AppState;

/// Auto-wipe intervals shorter than this are rejected; a tight loop of
/// full-prefix listings is a self-inflicted denial of service.
const MIN_WIPE_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub link: String,
    #[serde(rename = "dateUploaded")]
    pub date_uploaded: String,
}

#[derive(Debug, Deserialize)]
pub struct WipeSettingsRequest {
    pub enabled: bool,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user,
    })
}

/// The user's stored files with display links.
pub async fn list_my_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let mut files = state
        .db
        .get_files_by_uploader(&user.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    files.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let files = files
        .into_iter()
        .map(|f| FileEntry {
            link: format!("https://{}/{}", f.domain, f.filename),
            date_uploaded: f.created_at.to_rfc3339(),
            filename: f.filename,
        })
        .collect();

    Ok(Json(FileListResponse {
        success: true,
        files,
    }))
}

/// Enable, disable, or retune the recurring auto-wipe. The stored setting
/// and the in-memory timer are updated together; rescheduling always
/// replaces the previous timer so a superseded interval cannot fire.
pub async fn update_wipe_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<WipeSettingsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let setting = if req.enabled {
        let interval_secs = req
            .interval_secs
            .ok_or_else(|| ApiError::bad_request("interval_secs is required when enabling"))?;
        if interval_secs < MIN_WIPE_INTERVAL_SECS {
            return Err(ApiError::bad_request(format!(
                "interval_secs must be at least {MIN_WIPE_INTERVAL_SECS}"
            )));
        }
        AutoWipe {
            enabled: true,
            interval_secs,
        }
    } else {
        AutoWipe::default()
    };

    state
        .db
        .set_auto_wipe(&user.id, setting.clone())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if setting.enabled {
        state
            .scheduler
            .schedule(&user.id, Duration::from_secs(setting.interval_secs));
    } else {
        state.scheduler.cancel(&user.id);
    }

    Ok(Json(MessageResponse {
        success: true,
        message: if setting.enabled {
            "Auto-wipe scheduled.".to_string()
        } else {
            "Auto-wipe disabled.".to_string()
        },
    }))
}
