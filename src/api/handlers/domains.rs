use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::AdminUser;
use crate::api::response::{ApiError, AppJson};
use crate::storage::models::Domain;
use crate::storage::DomainRemoval;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DomainListResponse {
    pub success: bool,
    pub domains: Vec<DomainEntry>,
}

#[derive(Debug, Serialize)]
pub struct DomainEntry {
    pub name: String,
    pub wildcard: bool,
    #[serde(rename = "userOnly")]
    pub user_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default, rename = "userOnly")]
    pub user_only: bool,
    #[serde(default, rename = "donatedBy")]
    pub donated_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_domains(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DomainListResponse>, ApiError> {
    let domains = state
        .db
        .get_all_domains()
        .map_err(|e| ApiError::internal(e.to_string()))?
        .into_iter()
        .map(|d| DomainEntry {
            name: d.name,
            wildcard: d.wildcard,
            user_only: d.user_only,
        })
        .collect();

    Ok(Json(DomainListResponse {
        success: true,
        domains,
    }))
}

/// Register a domain. A `userOnly` domain gets its own storage prefix and
/// must name its donor; uploads through it stay attributed to that donor.
pub async fn create_domain(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    AppJson(req): AppJson<CreateDomainRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = req.name.trim().to_lowercase();
    if name.is_empty() || !name.contains('.') {
        return Err(ApiError::bad_request("Provide a valid domain name."));
    }

    if state
        .db
        .get_domain(&name)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::conflict("Domain is already registered."));
    }

    if req.user_only {
        let donor = req
            .donated_by
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("userOnly domains must name a donor."))?;
        if state
            .db
            .get_user(donor)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .is_none()
        {
            return Err(ApiError::bad_request("Donor user does not exist."));
        }
    }

    let domain = Domain {
        name: name.clone(),
        wildcard: req.wildcard,
        user_only: req.user_only,
        donated_by: req.donated_by,
        added_at: Utc::now(),
    };
    state
        .db
        .put_domain(&domain)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(domain = %name, user_only = domain.user_only, "registered domain");

    Ok(Json(MessageResponse {
        success: true,
        message: "Domain registered successfully.".to_string(),
    }))
}

pub async fn remove_domain(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state
        .db
        .remove_domain(&name)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        DomainRemoval::Removed => Ok(Json(MessageResponse {
            success: true,
            message: "Domain removed successfully.".to_string(),
        })),
        DomainRemoval::NotFound => Err(ApiError::not_found("Domain not found.")),
        DomainRemoval::InUse => Err(ApiError::conflict(
            "Domain still has stored files; delete or wipe them first.",
        )),
    }
}
