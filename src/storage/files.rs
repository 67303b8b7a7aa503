use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FileRecord, ShortUrl};
use super::tables::*;
use super::users::mutate_user_in;

/// Outcome of removing a single file record.
#[derive(Debug)]
pub struct RemovedFile {
    pub file: FileRecord,
    /// False when the uploader's counter was already at zero and was left
    /// alone rather than going negative.
    pub decremented: bool,
    /// Invisible/short URL records that pointed at the file.
    pub urls_removed: u64,
}

/// Outcome of the wipe bookkeeping commit.
#[derive(Debug, Default)]
pub struct WipedRecords {
    pub files: u64,
    pub urls: u64,
}

impl Database {
    // ========================================================================
    // File record operations
    // ========================================================================

    /// Store a file record, update the deletion-key and uploader indexes,
    /// and increment the uploader's counter in one transaction, so the
    /// record and the counter commit together.
    pub fn create_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.filename.is_empty(), "filename must not be empty");
        debug_assert!(
            !file.deletion_key.is_empty(),
            "deletion key must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.filename.as_str(), data.as_slice())?;
            drop(table);

            let mut key_table = write_txn.open_table(DELETION_KEYS)?;
            key_table.insert(file.deletion_key.as_str(), file.filename.as_str())?;
            drop(key_table);

            // Maintain uploader index
            let mut user_files = write_txn.open_table(USER_FILES)?;
            let mut filenames: Vec<String> = user_files
                .get(file.uploader_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();
            if !filenames.contains(&file.filename) {
                filenames.push(file.filename.clone());
                let index_data = rmp_serde::to_vec_named(&filenames)?;
                user_files.insert(file.uploader_id.as_str(), index_data.as_slice())?;
            }
            drop(user_files);

            // Counter commit
            mutate_user_in(&write_txn, file.uploader_id.as_str(), |user| {
                user.uploads += 1
            })?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file record by filename
    pub fn get_file(&self, filename: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(filename)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get a file record by its deletion key (resolves key -> filename -> file)
    pub fn get_file_by_deletion_key(
        &self,
        deletion_key: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let key_table = read_txn.open_table(DELETION_KEYS)?;

        let filename = match key_table.get(deletion_key)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let files_table = read_txn.open_table(FILES)?;
        match files_table.get(filename.as_str())? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get all file records owned by a user
    pub fn get_files_by_uploader(&self, user_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let user_files = read_txn.open_table(USER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let filenames: Vec<String> = match user_files.get(user_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for filename in filenames {
            if let Some(data) = files_table.get(filename.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        Ok(files)
    }

    /// Remove a file record: record, deletion-key index, uploader index,
    /// any URL records pointing at the file, and a floored decrement of the
    /// uploader's counter. One transaction.
    ///
    /// Returns `None` when no record exists for the filename.
    pub fn remove_file(&self, filename: &str) -> Result<Option<RemovedFile>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<FileRecord> = {
            let table = write_txn.open_table(FILES)?;
            let found = match table.get(filename)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            found
        };

        let removed = match existing {
            Some(file) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(filename)?;
                }
                {
                    let mut key_table = write_txn.open_table(DELETION_KEYS)?;
                    key_table.remove(file.deletion_key.as_str())?;
                }

                // Uploader index
                {
                    let mut user_files = write_txn.open_table(USER_FILES)?;
                    let filenames: Option<Vec<String>> =
                        match user_files.get(file.uploader_id.as_str())? {
                            Some(data) => Some(rmp_serde::from_slice(data.value())?),
                            None => None,
                        };
                    if let Some(mut names) = filenames {
                        names.retain(|n| n != filename);
                        if names.is_empty() {
                            user_files.remove(file.uploader_id.as_str())?;
                        } else {
                            let data = rmp_serde::to_vec_named(&names)?;
                            user_files.insert(file.uploader_id.as_str(), data.as_slice())?;
                        }
                    }
                }

                // Cascade URL records that point at this file
                let urls_removed = remove_urls_for_file(&write_txn, &file.uploader_id, filename)?;

                // Floored counter decrement
                let mut decremented = false;
                mutate_user_in(&write_txn, file.uploader_id.as_str(), |user| {
                    if user.uploads > 0 {
                        user.uploads -= 1;
                        decremented = true;
                    }
                })?;

                Some(RemovedFile {
                    file,
                    decremented,
                    urls_removed,
                })
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(removed)
    }

    /// The terminal commit of a wipe: delete every file record, every URL
    /// record, and reset the upload counter to zero in one transaction,
    /// executed only after physical deletion succeeded.
    pub fn wipe_user_records(&self, user_id: &str) -> Result<WipedRecords, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut stats = WipedRecords::default();

        // File records + indexes
        {
            let filenames: Vec<String> = {
                let user_files = write_txn.open_table(USER_FILES)?;
                let names = user_files
                    .get(user_id)?
                    .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                    .unwrap_or_default();
                names
            };

            let mut files_table = write_txn.open_table(FILES)?;
            let mut key_table = write_txn.open_table(DELETION_KEYS)?;
            for filename in &filenames {
                let file: Option<FileRecord> = match files_table.get(filename.as_str())? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                if let Some(file) = file {
                    files_table.remove(filename.as_str())?;
                    key_table.remove(file.deletion_key.as_str())?;
                    stats.files += 1;
                }
            }
            drop(files_table);
            drop(key_table);

            let mut user_files = write_txn.open_table(USER_FILES)?;
            user_files.remove(user_id)?;
        }

        // URL records + indexes
        {
            let short_ids: Vec<String> = {
                let user_urls = write_txn.open_table(USER_URLS)?;
                let ids = user_urls
                    .get(user_id)?
                    .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                    .unwrap_or_default();
                ids
            };

            let mut urls_table = write_txn.open_table(SHORT_URLS)?;
            let mut key_table = write_txn.open_table(SHORT_DELETION_KEYS)?;
            for short_id in &short_ids {
                let url: Option<ShortUrl> = match urls_table.get(short_id.as_str())? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                if let Some(url) = url {
                    urls_table.remove(short_id.as_str())?;
                    key_table.remove(url.deletion_key.as_str())?;
                    stats.urls += 1;
                }
            }
            drop(urls_table);
            drop(key_table);

            let mut user_urls = write_txn.open_table(USER_URLS)?;
            user_urls.remove(user_id)?;
        }

        // Counter reset
        mutate_user_in(&write_txn, user_id, |user| user.uploads = 0)?;

        write_txn.commit()?;
        Ok(stats)
    }
}

/// Remove the user's URL records whose `filename` matches the given file.
fn remove_urls_for_file(
    write_txn: &redb::WriteTransaction,
    user_id: &str,
    filename: &str,
) -> Result<u64, DatabaseError> {
    let short_ids: Vec<String> = {
        let user_urls = write_txn.open_table(USER_URLS)?;
        let ids = user_urls
            .get(user_id)?
            .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
            .unwrap_or_default();
        ids
    };

    if short_ids.is_empty() {
        return Ok(0);
    }

    let mut removed = 0;
    let mut remaining = Vec::with_capacity(short_ids.len());
    {
        let mut urls_table = write_txn.open_table(SHORT_URLS)?;
        let mut key_table = write_txn.open_table(SHORT_DELETION_KEYS)?;
        for short_id in &short_ids {
            let url: Option<ShortUrl> = match urls_table.get(short_id.as_str())? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            match url {
                Some(url) if url.filename.as_deref() == Some(filename) => {
                    urls_table.remove(short_id.as_str())?;
                    key_table.remove(url.deletion_key.as_str())?;
                    removed += 1;
                }
                Some(_) => remaining.push(short_id.clone()),
                None => {}
            }
        }
    }

    let mut user_urls = write_txn.open_table(USER_URLS)?;
    if remaining.is_empty() {
        user_urls.remove(user_id)?;
    } else {
        let data = rmp_serde::to_vec_named(&remaining)?;
        user_urls.insert(user_id, data.as_slice())?;
    }

    Ok(removed)
}
