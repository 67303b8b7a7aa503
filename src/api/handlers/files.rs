use std::path::Path as FilePath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::accounting_error;
use crate::api::extract::AuthUser;
use crate::api::response::{ApiError, AppQuery};
use crate::generate;
use crate::storage::models::{FileRecord, User};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "deletionUrl")]
    pub deletion_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WipeResponse {
    pub success: bool,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeletionParams {
    pub key: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// ShareX-style upload: multipart `file` field, `key` header auth, optional
/// `domain` header overriding the user's home domain.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_data = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        original_name = field.file_name().map(|s| s.to_string());
        content_type = field.content_type().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

        if data.len() as u64 > state.config.max_upload_size {
            return Err(ApiError::payload_too_large(format!(
                "File exceeds maximum upload size of {} bytes",
                state.config.max_upload_size
            )));
        }
        file_data = Some(data);
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("Provide a file."))?;

    let domain_name = pick_domain(&user, &headers);

    // user_only domains are reserved for their donor
    if let Some(domain) = state
        .db
        .get_domain(&domain_name)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        if domain.user_only && domain.donated_by.as_deref() != Some(user.id.as_str()) {
            return Err(ApiError::forbidden(
                "This domain is reserved for its donor.",
            ));
        }
    }

    // MIME: multipart Content-Type, or guess from the original filename
    let mime_type = content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            original_name
                .as_deref()
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let extension = original_name
        .as_deref()
        .and_then(|n| FilePath::new(n).extension())
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let filename = format!("{}{extension}", generate::file_name());
    let deletion_key = generate::deletion_key();

    let record = FileRecord {
        filename: filename.clone(),
        original_name,
        mime_type,
        domain: domain_name.clone(),
        deletion_key: deletion_key.clone(),
        uploader_id: user.id.clone(),
        created_at: Utc::now(),
    };

    // Phase 1: write the object
    let key = state
        .accounting
        .object_key(&record)
        .map_err(accounting_error)?;
    state
        .object_store
        .put(&key, file_data)
        .await
        .map_err(ApiError::unavailable)?;

    // Phase 2: commit record + counter; roll the object back on failure so
    // a failed upload never reports success
    if let Err(e) = state.accounting.record_upload(&record) {
        state.accounting.rollback_upload(&record).await;
        return Err(accounting_error(e));
    }

    let host = host_for(&user, &domain_name);
    let direct_url = format!("https://{host}/{filename}");

    // Invisible URLs: hand back a short link to the file instead of the
    // direct one; its record cascades away with the file.
    let image_url = if user.settings.invisible_url {
        match state
            .accounting
            .link_invisible_url(&user, &record, &direct_url)
        {
            Ok(url) => format!("https://{host}/{}", url.short_id),
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "invisible URL creation failed, returning direct link");
                direct_url
            }
        }
    } else {
        direct_url
    };

    Ok(Json(UploadResponse {
        success: true,
        image_url,
        deletion_url: format!(
            "{}/files/delete?key={deletion_key}",
            state.config.base_url
        ),
    }))
}

/// Deletion-token delete: the capability link issued at upload time.
pub async fn delete_by_key(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<DeletionParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let file = state
        .db
        .get_file_by_deletion_key(&params.key)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Invalid deletion key."))?;

    state
        .accounting
        .delete_file(&file)
        .await
        .map_err(accounting_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "File deleted successfully.".to_string(),
    }))
}

/// Authenticated owner delete by filename.
pub async fn delete_own_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let file = state
        .db
        .get_file(&filename)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found."))?;

    if file.uploader_id != user.id {
        return Err(ApiError::forbidden("You do not own this file."));
    }

    state
        .accounting
        .delete_file(&file)
        .await
        .map_err(accounting_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "File deleted successfully.".to_string(),
    }))
}

/// Bulk reclaim of everything the user has stored.
pub async fn wipe_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<WipeResponse>, ApiError> {
    let count = state
        .accounting
        .wipe(&user.id)
        .await
        .map_err(accounting_error)?;

    Ok(Json(WipeResponse {
        success: true,
        count,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Storage/display domain for an upload: explicit `domain` header, else a
/// random pick from the user's pool, else their home domain.
fn pick_domain(user: &User, headers: &HeaderMap) -> String {
    if let Some(domain) = headers.get("domain").and_then(|v| v.to_str().ok()) {
        if !domain.is_empty() {
            return domain.to_string();
        }
    }

    if user.settings.random_domain.enabled {
        if let Some(domain) = generate::pick(&user.settings.random_domain.domains) {
            return domain.clone();
        }
    }

    user.settings.domain.name.clone()
}

/// Hostname for returned URLs; the subdomain only applies to the user's
/// own home domain.
fn host_for(user: &User, domain_name: &str) -> String {
    if domain_name == user.settings.domain.name {
        if let Some(sub) = user.settings.domain.subdomain.as_deref() {
            if !sub.is_empty() {
                return format!("{sub}.{domain_name}");
            }
        }
    }
    domain_name.to_string()
}
