use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{Listing, ObjectStore, ObjectStoreError};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Local filesystem object store for development and testing.
///
/// Keys map to paths under the base directory, so a `{prefix}/{filename}`
/// key lands in a per-prefix subdirectory.
pub struct LocalStore {
    base_path: PathBuf,
    page_size: usize,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        Self::with_page_size(base_path, DEFAULT_PAGE_SIZE)
    }

    /// Create a store with a custom listing page size. Small pages force
    /// multi-page listings, which is how the wipe pagination is exercised.
    pub fn with_page_size<P: AsRef<Path>>(
        base_path: P,
        page_size: usize,
    ) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            page_size: page_size.max(1),
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key);
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Listing, ObjectStoreError> {
        let prefix = if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        let dir = self.base_path.join(prefix.trim_end_matches('/'));
        if !dir.is_dir() {
            return Ok(Listing::default());
        }

        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{prefix}{}", entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();

        // Continuation is the last key of the previous page
        if let Some(after) = continuation {
            keys.retain(|k| k.as_str() > after);
        }

        let truncated = keys.len() > self.page_size;
        keys.truncate(self.page_size);
        let continuation = if truncated { keys.last().cloned() } else { None };

        Ok(Listing {
            keys,
            truncated,
            continuation,
        })
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<u64, ObjectStoreError> {
        let mut deleted = 0;
        for key in keys {
            let path = self.object_path(key);
            if path.exists() {
                tokio::fs::remove_file(&path).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(key);
        Ok(path.exists())
    }
}
