use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{AutoWipe, Blacklist, User};
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Store a user record and update the upload-key and username indexes
    pub fn put_user(&self, user: &User) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        insert_user(&write_txn, user)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user by their UUID
    pub fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => {
                let user: User = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Get a user by their upload key (resolves key -> uuid -> user)
    pub fn get_user_by_key(&self, key: &str) -> Result<Option<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let key_table = read_txn.open_table(USER_KEYS)?;

        let id = match key_table.get(key)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users_table = read_txn.open_table(USERS)?;
        match users_table.get(id.as_str())? {
            Some(data) => {
                let user: User = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Check if a username is taken
    pub fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERNAMES)?;
        Ok(table.get(username)?.is_some())
    }

    /// Get all users (for auto-wipe rehydration at startup)
    pub fn get_all_users(&self) -> Result<Vec<User>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        let mut users = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let user: User = rmp_serde::from_slice(value.value())?;
            users.push(user);
        }

        Ok(users)
    }

    /// Update the user's auto-wipe schedule setting
    pub fn set_auto_wipe(&self, id: &str, auto_wipe: AutoWipe) -> Result<bool, DatabaseError> {
        self.mutate_user(id, |user| user.settings.auto_wipe = auto_wipe)
    }

    /// Set or clear the user's blacklist status
    pub fn set_blacklist(&self, id: &str, blacklist: Blacklist) -> Result<bool, DatabaseError> {
        self.mutate_user(id, |user| user.blacklisted = blacklist)
    }

    /// Add an auto-mod strike; returns the new strike count
    pub fn add_strike(&self, id: &str) -> Result<u32, DatabaseError> {
        let mut strikes = 0;
        self.mutate_user(id, |user| {
            user.strikes += 1;
            strikes = user.strikes;
        })?;
        Ok(strikes)
    }

    /// Consume one invite credit. Returns false if the user has none left.
    pub fn take_invite_credit(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut taken = false;
        self.mutate_user(id, |user| {
            if user.invites > 0 {
                user.invites -= 1;
                taken = true;
            }
        })?;
        Ok(taken)
    }

    /// Add a domain to the user's random-domain pool
    pub fn push_random_domain(&self, id: &str, domain: &str) -> Result<bool, DatabaseError> {
        self.mutate_user(id, |user| {
            let pool = &mut user.settings.random_domain.domains;
            if !pool.iter().any(|d| d == domain) {
                pool.push(domain.to_string());
            }
        })
    }

    /// Remove a domain from the user's random-domain pool
    pub fn pull_random_domain(&self, id: &str, domain: &str) -> Result<bool, DatabaseError> {
        self.mutate_user(id, |user| {
            user.settings.random_domain.domains.retain(|d| d != domain);
        })
    }

    /// Read-modify-write a user in its own write transaction.
    fn mutate_user<F>(&self, id: &str, mutate: F) -> Result<bool, DatabaseError>
    where
        F: FnOnce(&mut User),
    {
        let write_txn = self.begin_write()?;
        let updated = mutate_user_in(&write_txn, id, mutate)?;
        write_txn.commit()?;
        Ok(updated)
    }
}

/// Insert a user and both lookup indexes into an open transaction.
pub(super) fn insert_user(write_txn: &WriteTransaction, user: &User) -> Result<(), DatabaseError> {
    debug_assert!(!user.id.is_empty(), "user id must not be empty");
    debug_assert!(!user.key.is_empty(), "upload key must not be empty");

    let mut table = write_txn.open_table(USERS)?;
    let data = rmp_serde::to_vec_named(user)?;
    table.insert(user.id.as_str(), data.as_slice())?;
    drop(table);

    let mut key_table = write_txn.open_table(USER_KEYS)?;
    key_table.insert(user.key.as_str(), user.id.as_str())?;
    drop(key_table);

    let mut name_table = write_txn.open_table(USERNAMES)?;
    name_table.insert(user.username.as_str(), user.id.as_str())?;

    Ok(())
}

/// Read-modify-write a user inside an already-open write transaction.
/// The file-record transactions route their counter updates through here
/// so counter logic lives in one place.
pub(super) fn mutate_user_in<F>(
    write_txn: &WriteTransaction,
    id: &str,
    mutate: F,
) -> Result<bool, DatabaseError>
where
    F: FnOnce(&mut User),
{
    let existing: Option<User> = {
        let table = write_txn.open_table(USERS)?;
        let found = match table.get(id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        found
    };

    match existing {
        Some(mut user) => {
            mutate(&mut user);
            let data = rmp_serde::to_vec_named(&user)?;
            let mut table = write_txn.open_table(USERS)?;
            table.insert(id, data.as_slice())?;
            Ok(true)
        }
        None => Ok(false),
    }
}
