use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::ShortUrl;
use super::tables::*;

impl Database {
    // ========================================================================
    // Short / invisible URL operations
    // ========================================================================

    /// Store a URL record and update the deletion-key and creator indexes
    pub fn create_short_url(&self, url: &ShortUrl) -> Result<(), DatabaseError> {
        debug_assert!(!url.short_id.is_empty(), "short id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SHORT_URLS)?;
            let data = rmp_serde::to_vec_named(url)?;
            table.insert(url.short_id.as_str(), data.as_slice())?;

            let mut key_table = write_txn.open_table(SHORT_DELETION_KEYS)?;
            key_table.insert(url.deletion_key.as_str(), url.short_id.as_str())?;

            let mut user_urls = write_txn.open_table(USER_URLS)?;
            let mut ids: Vec<String> = user_urls
                .get(url.user_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();
            if !ids.contains(&url.short_id) {
                ids.push(url.short_id.clone());
                let index_data = rmp_serde::to_vec_named(&ids)?;
                user_urls.insert(url.user_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a URL record by its short id
    pub fn get_short_url(&self, short_id: &str) -> Result<Option<ShortUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SHORT_URLS)?;

        match table.get(short_id)? {
            Some(data) => {
                let url: ShortUrl = rmp_serde::from_slice(data.value())?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    /// Get a URL record by its deletion key
    pub fn get_short_url_by_deletion_key(
        &self,
        deletion_key: &str,
    ) -> Result<Option<ShortUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let key_table = read_txn.open_table(SHORT_DELETION_KEYS)?;

        let short_id = match key_table.get(deletion_key)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let urls_table = read_txn.open_table(SHORT_URLS)?;
        match urls_table.get(short_id.as_str())? {
            Some(data) => {
                let url: ShortUrl = rmp_serde::from_slice(data.value())?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    /// Get all URL records created by a user
    pub fn get_urls_by_user(&self, user_id: &str) -> Result<Vec<ShortUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let user_urls = read_txn.open_table(USER_URLS)?;
        let urls_table = read_txn.open_table(SHORT_URLS)?;

        let short_ids: Vec<String> = match user_urls.get(user_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut urls = Vec::new();
        for short_id in short_ids {
            if let Some(data) = urls_table.get(short_id.as_str())? {
                let url: ShortUrl = rmp_serde::from_slice(data.value())?;
                urls.push(url);
            }
        }

        Ok(urls)
    }

    /// Remove a URL record and clean up both indexes
    pub fn remove_short_url(&self, short_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<ShortUrl> = {
            let table = write_txn.open_table(SHORT_URLS)?;
            let found = match table.get(short_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            found
        };

        let removed = match existing {
            Some(url) => {
                {
                    let mut table = write_txn.open_table(SHORT_URLS)?;
                    table.remove(short_id)?;
                }
                {
                    let mut key_table = write_txn.open_table(SHORT_DELETION_KEYS)?;
                    key_table.remove(url.deletion_key.as_str())?;
                }
                {
                    let mut user_urls = write_txn.open_table(USER_URLS)?;
                    let ids: Option<Vec<String>> = match user_urls.get(url.user_id.as_str())? {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    };
                    if let Some(mut ids) = ids {
                        ids.retain(|id| id != short_id);
                        if ids.is_empty() {
                            user_urls.remove(url.user_id.as_str())?;
                        } else {
                            let data = rmp_serde::to_vec_named(&ids)?;
                            user_urls.insert(url.user_id.as_str(), data.as_slice())?;
                        }
                    }
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(removed)
    }
}
