use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::AuthUser;
use crate::api::response::{ApiError, AppJson};
use crate::generate;
use crate::storage::models::{Blacklist, Invite, User, UserSettings};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub invite: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub id: String,
    /// Upload key; presented in the `key` header from here on.
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub success: bool,
    pub code: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Invite-code registration. Consumes the invite and issues an upload key.
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = req.username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username must be between 3 and 32 characters.",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::bad_request(
            "Username may only contain letters, numbers, underscores and hyphens.",
        ));
    }

    if state
        .db
        .username_exists(username)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        return Err(ApiError::conflict("Username is taken."));
    }

    let invite = state
        .db
        .get_invite(&req.invite)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::bad_request("Invalid invite code."))?;
    if invite.used_by.is_some() {
        return Err(ApiError::bad_request("Invite code already used."));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        key: generate::upload_key(),
        invite: invite.code.clone(),
        invites: 0,
        invited_by: Some(invite.created_by.clone()),
        admin: false,
        strikes: 0,
        blacklisted: Blacklist::default(),
        uploads: 0,
        registered_at: Utc::now(),
        settings: UserSettings::with_domain(&state.config.default_domain),
    };

    // Invite consumption and user creation commit together; a racing
    // registration loses here
    let registered = state
        .db
        .register_user(&user, &invite.code)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !registered {
        return Err(ApiError::bad_request("Invite code already used."));
    }

    tracing::info!(user_id = %user.id, username = %user.username, "registered user");

    Ok(Json(RegisterResponse {
        success: true,
        id: user.id,
        key: user.key,
    }))
}

/// Mint an invite code. Admins mint freely; everyone else spends one of
/// their invite credits.
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<InviteResponse>, ApiError> {
    if !user.admin {
        let taken = state
            .db
            .take_invite_credit(&user.id)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        if !taken {
            return Err(ApiError::forbidden("No invites left."));
        }
    }

    let invite = Invite {
        code: generate::invite_code(),
        created_by: user.id,
        used_by: None,
        created_at: Utc::now(),
    };
    state
        .db
        .put_invite(&invite)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(InviteResponse {
        success: true,
        code: invite.code,
    }))
}
