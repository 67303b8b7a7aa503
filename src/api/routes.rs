use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Files
        .route(
            "/files",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/files/delete",
            get(handlers::delete_by_key).delete(handlers::delete_by_key),
        )
        .route("/files/wipe", post(handlers::wipe_files))
        .route("/files/:filename", delete(handlers::delete_own_file))
        // Users
        .route("/users/@me", get(handlers::get_me))
        .route("/users/@me/files", get(handlers::list_my_files))
        .route(
            "/users/@me/settings/wipe",
            put(handlers::update_wipe_settings),
        )
        // Auth
        .route("/auth/register", post(handlers::register))
        .route("/invites", post(handlers::create_invite))
        // Shortener
        .route("/shortener", post(handlers::shorten))
        .route(
            "/shortener/delete",
            get(handlers::delete_short_url).delete(handlers::delete_short_url),
        )
        // Domains
        .route("/domains", get(handlers::list_domains))
        .route("/admin/domains", post(handlers::create_domain))
        .route("/admin/domains/:name", delete(handlers::remove_domain))
        // Admin
        .route("/admin/blacklist/:id", post(handlers::blacklist_user))
        .route("/admin/files/:filename", delete(handlers::admin_delete_file))
        // Health
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
