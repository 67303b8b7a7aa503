mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// One page of a prefix listing. The backend signals truncation; callers
/// pass `continuation` back in to fetch the next page.
#[derive(Debug, Default)]
pub struct Listing {
    pub keys: Vec<String>,
    pub truncated: bool,
    pub continuation: Option<String>,
}

/// Abstraction over object storage backends.
///
/// Keys are `{prefix}/{filename}` where the prefix is either a user id or
/// a user-only domain name. No consistency is assumed beyond what a single
/// listing call returns.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    /// Delete a single object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    /// List one page of keys under a prefix.
    async fn list(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Listing, ObjectStoreError>;
    /// Batched delete; returns the number of objects actually removed.
    async fn delete_objects(&self, keys: &[String]) -> Result<u64, ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}
