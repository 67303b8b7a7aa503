use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::AuthUser;
use crate::api::response::{ApiError, AppJson, AppQuery};
use crate::generate;
use crate::storage::models::{Blacklist, ShortUrl};
use crate::AppState;

/// Known IP-logger hosts; shortening one earns a strike, the third strike
/// blacklists the account.
const IP_LOGGER_HOSTS: &[&str] = &[
    "grabify.link",
    "grabify.org",
    "iplogger.org",
    "iplogger.com",
    "iplogger.ru",
    "iplis.ru",
    "2no.co",
    "yip.su",
    "blasze.tk",
    "blasze.com",
    "stopify.co",
    "ps3cfw.com",
];

const MAX_STRIKES: u32 = 3;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub success: bool,
    #[serde(rename = "shortenedUrl")]
    pub shortened_url: String,
    #[serde(rename = "deletionUrl")]
    pub deletion_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletionParams {
    pub key: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn shorten(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<ShortenRequest>,
) -> Result<Json<ShortenResponse>, ApiError> {
    let url = req.url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ApiError::bad_request("Provide a valid URL."));
    }

    if is_ip_logger(url) {
        let strikes = state
            .db
            .add_strike(&user.id)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        if strikes >= MAX_STRIKES {
            state
                .db
                .set_blacklist(
                    &user.id,
                    Blacklist {
                        status: true,
                        reason: Some("banned by auto-mod, shortening IP loggers".to_string()),
                    },
                )
                .map_err(|e| ApiError::internal(e.to_string()))?;

            tracing::warn!(user_id = %user.id, "auto-mod blacklisted user for IP logger shortening");
            return Err(ApiError::forbidden("You have been suspended by auto-mod."));
        }

        return Err(ApiError::bad_request(
            "IP logger detected; further attempts will result in suspension.",
        ));
    }

    let short_id = generate::short_id(user.settings.long_url);
    let deletion_key = generate::deletion_key();

    let base = if user.settings.random_domain.enabled {
        generate::pick(&user.settings.random_domain.domains)
            .cloned()
            .unwrap_or_else(|| user.settings.domain.name.clone())
    } else {
        user.settings.domain.name.clone()
    };

    let record = ShortUrl {
        short_id: short_id.clone(),
        destination: url.to_string(),
        filename: None,
        deletion_key: deletion_key.clone(),
        user_id: user.id,
        created_at: Utc::now(),
    };
    state
        .db
        .create_short_url(&record)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ShortenResponse {
        success: true,
        shortened_url: format!("https://{base}/{short_id}"),
        deletion_url: format!(
            "{}/shortener/delete?key={deletion_key}",
            state.config.base_url
        ),
    }))
}

pub async fn delete_short_url(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<DeletionParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let url = state
        .db
        .get_short_url_by_deletion_key(&params.key)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Invalid deletion key."))?;

    state
        .db
        .remove_short_url(&url.short_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Short URL deleted successfully.".to_string(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn is_ip_logger(url: &str) -> bool {
    let lower = url.to_lowercase();
    IP_LOGGER_HOSTS.iter().any(|host| lower.contains(host))
}
