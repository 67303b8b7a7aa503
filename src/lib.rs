//! lumen - A multi-tenant, ShareX-compatible file host and URL shortener
//!
//! This crate provides invite-gated uploads, deletion-token deletes, and
//! full account wipes with:
//! - Swappable object storage backends (local filesystem, GCS)
//! - Per-user storage accounting (upload counters, paginated wipes)
//! - redb embedded database for bookkeeping (ACID, MVCC, crash-safe)
//! - REST API with multipart upload support

pub mod accounting;
pub mod api;
pub mod config;
pub mod generate;
pub mod object_store;
pub mod scheduler;
pub mod storage;

use std::sync::Arc;

use accounting::StorageAccounting;
use config::Config;
use scheduler::WipeScheduler;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub accounting: StorageAccounting,
    pub scheduler: Arc<WipeScheduler>,
    pub object_store: Arc<dyn object_store::ObjectStore>,
}
