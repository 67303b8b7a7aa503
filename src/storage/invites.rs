use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Invite, User};
use super::tables::*;
use super::users::insert_user;

impl Database {
    // ========================================================================
    // Invite operations
    // ========================================================================

    pub fn put_invite(&self, invite: &Invite) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(INVITES)?;
            let data = rmp_serde::to_vec_named(invite)?;
            table.insert(invite.code.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_invite(&self, code: &str) -> Result<Option<Invite>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(INVITES)?;

        match table.get(code)? {
            Some(data) => {
                let invite: Invite = rmp_serde::from_slice(data.value())?;
                Ok(Some(invite))
            }
            None => Ok(None),
        }
    }

    /// Consume the invite and create the user in one transaction, so a
    /// failed user write cannot burn the code. Returns false (and writes
    /// nothing) when the code is missing or already used; a racing
    /// registration loses here.
    pub fn register_user(&self, user: &User, invite_code: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<Invite> = {
            let table = write_txn.open_table(INVITES)?;
            let found = match table.get(invite_code)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            found
        };

        let registered = match existing {
            Some(mut invite) if invite.used_by.is_none() => {
                invite.used_by = Some(user.id.clone());
                let data = rmp_serde::to_vec_named(&invite)?;
                {
                    let mut table = write_txn.open_table(INVITES)?;
                    table.insert(invite_code, data.as_slice())?;
                }
                insert_user(&write_txn, user)?;
                true
            }
            _ => false,
        };

        write_txn.commit()?;
        Ok(registered)
    }
}
