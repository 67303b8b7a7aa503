//! Storage accounting: keeps a user's upload counter and the objects under
//! their storage prefixes consistent.
//!
//! Every mutation follows the same ordering: the physical object operation
//! happens first, the bookkeeping commit second. A failed backend call
//! therefore leaves bookkeeping untouched and the operation retryable.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generate;
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{FileRecord, ShortUrl, User};
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum AccountingError {
    /// Record or user lookup miss; no state was changed.
    #[error("record not found")]
    NotFound,
    /// Storage backend call failed; the operation aborted with no partial
    /// commit and may be retried.
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ObjectStoreError> for AccountingError {
    fn from(e: ObjectStoreError) -> Self {
        AccountingError::Backend(e.to_string())
    }
}

/// Owns the invariant that `user.uploads` equals the number of live file
/// records (and stored objects) attributed to the user.
pub struct StorageAccounting {
    db: Database,
    store: Arc<dyn ObjectStore>,
}

impl Clone for StorageAccounting {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl StorageAccounting {
    pub fn new(db: Database, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, store }
    }

    /// The prefix a file's object lives under: a `user_only` domain keeps
    /// its objects under the domain's own name, everything else under the
    /// uploader's id. Ownership is attributed to the uploader either way.
    pub fn prefix_for(&self, domain: &str, uploader_id: &str) -> Result<String, AccountingError> {
        match self.db.get_domain(domain)? {
            Some(d) if d.user_only => Ok(format!("{}/", d.name)),
            _ => Ok(format!("{uploader_id}/")),
        }
    }

    /// Full storage key for a file record.
    pub fn object_key(&self, file: &FileRecord) -> Result<String, AccountingError> {
        let prefix = self.prefix_for(&file.domain, &file.uploader_id)?;
        Ok(format!("{prefix}{}", file.filename))
    }

    /// Commit the bookkeeping for an object that was just durably written:
    /// file record and counter increment, one transaction.
    ///
    /// On failure the caller must treat the upload as failed and roll the
    /// object back via [`rollback_upload`](Self::rollback_upload).
    pub fn record_upload(&self, file: &FileRecord) -> Result<(), AccountingError> {
        self.db.create_file(file)?;
        debug!(
            filename = %file.filename,
            uploader = %file.uploader_id,
            domain = %file.domain,
            "recorded upload"
        );
        Ok(())
    }

    /// Best-effort deletion of a just-written object whose record commit
    /// failed. Failure is logged, not retried; the orphan is reclaimed by
    /// the next wipe.
    pub async fn rollback_upload(&self, file: &FileRecord) {
        let key = match self.object_key(file) {
            Ok(key) => key,
            Err(e) => {
                warn!(filename = %file.filename, error = %e, "upload rollback could not resolve key");
                return;
            }
        };
        if let Err(e) = self.store.delete(&key).await {
            warn!(key = %key, error = %e, "upload rollback failed, object orphaned");
        }
    }

    /// Create the invisible short URL for a freshly recorded upload. The
    /// record carries the filename, so deleting the file cascades it.
    pub fn link_invisible_url(
        &self,
        user: &User,
        file: &FileRecord,
        destination: &str,
    ) -> Result<ShortUrl, AccountingError> {
        let url = ShortUrl {
            short_id: generate::short_id(user.settings.long_url),
            destination: destination.to_string(),
            filename: Some(file.filename.clone()),
            deletion_key: generate::deletion_key(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
        };
        self.db.create_short_url(&url)?;
        Ok(url)
    }

    /// Delete one stored object and its bookkeeping.
    ///
    /// The object is deleted first; a missing object is fine (bookkeeping
    /// wins over strict backend existence), but a transport failure aborts
    /// before any record or counter is touched.
    pub async fn delete_file(&self, file: &FileRecord) -> Result<(), AccountingError> {
        let key = self.object_key(file)?;
        self.store.delete(&key).await?;

        match self.db.remove_file(&file.filename)? {
            Some(removed) => {
                if !removed.decremented {
                    warn!(
                        uploader = %file.uploader_id,
                        filename = %file.filename,
                        "upload counter already at zero, decrement skipped"
                    );
                }
                debug!(
                    filename = %file.filename,
                    uploader = %file.uploader_id,
                    urls_removed = removed.urls_removed,
                    "deleted file"
                );
                Ok(())
            }
            None => Err(AccountingError::NotFound),
        }
    }

    /// Reclaim every object the user owns across all of their prefixes:
    /// the personal `{id}/` prefix plus each donated `user_only` domain.
    ///
    /// Listing and deletion are paginated per prefix; any backend error
    /// aborts the whole wipe before bookkeeping is touched, so a retry
    /// starts from intact records. Only after every prefix drains are the
    /// file records, URL records, and counter committed away.
    ///
    /// Returns the number of objects physically deleted.
    pub async fn wipe(&self, user_id: &str) -> Result<u64, AccountingError> {
        let user = self.db.get_user(user_id)?.ok_or(AccountingError::NotFound)?;

        let mut prefixes = vec![format!("{}/", user.id)];
        for domain in self.db.get_donated_domains(&user.id)? {
            prefixes.push(format!("{}/", domain.name));
        }

        let mut total: u64 = 0;
        for prefix in &prefixes {
            let mut continuation: Option<String> = None;
            loop {
                let listing = self.store.list(prefix, continuation.as_deref()).await?;
                if !listing.keys.is_empty() {
                    total += self.store.delete_objects(&listing.keys).await?;
                }
                if !listing.truncated {
                    break;
                }
                continuation = listing.continuation;
            }
        }

        // Terminal commit: records, URLs, counter. Strictly after physical
        // deletion so bookkeeping never claims emptiness early.
        let records = self.db.wipe_user_records(&user.id)?;
        info!(
            user_id = %user.id,
            objects = total,
            records = records.files,
            urls = records.urls,
            prefixes = prefixes.len(),
            "wipe completed"
        );

        Ok(total)
    }
}
