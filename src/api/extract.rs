use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::storage::models::User;
use crate::AppState;

/// Upload-key authentication: resolves the `key` header to a user and
/// rejects blacklisted accounts.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let key = parts
            .headers
            .get("key")
            .and_then(|v| v.to_str().ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Provide a key."))?;

        let user = state
            .db
            .get_user_by_key(key)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::unauthorized("Invalid key."))?;

        if user.blacklisted.status {
            let reason = user
                .blacklisted
                .reason
                .clone()
                .unwrap_or_else(|| "no reason provided".to_string());
            return Err(ApiError::forbidden(format!(
                "You are blacklisted for: {reason}"
            )));
        }

        Ok(AuthUser(user))
    }
}

/// Same as [`AuthUser`] but requires the admin flag.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.admin {
            return Err(ApiError::forbidden("Admin access required."));
        }
        Ok(AdminUser(user))
    }
}
