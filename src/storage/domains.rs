use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Domain, FileRecord};
use super::tables::*;

/// Outcome of a domain removal attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum DomainRemoval {
    Removed,
    NotFound,
    /// File records still reference the domain. Removing it would re-point
    /// them to the uploader's id prefix and strand the stored objects.
    InUse,
}

impl Database {
    // ========================================================================
    // Domain registry
    // ========================================================================

    /// Register or update a domain
    pub fn put_domain(&self, domain: &Domain) -> Result<(), DatabaseError> {
        debug_assert!(!domain.name.is_empty(), "domain name must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DOMAINS)?;
            let data = rmp_serde::to_vec_named(domain)?;
            table.insert(domain.name.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a domain by name
    pub fn get_domain(&self, name: &str) -> Result<Option<Domain>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOMAINS)?;

        match table.get(name)? {
            Some(data) => {
                let domain: Domain = rmp_serde::from_slice(data.value())?;
                Ok(Some(domain))
            }
            None => Ok(None),
        }
    }

    /// List every registered domain
    pub fn get_all_domains(&self) -> Result<Vec<Domain>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOMAINS)?;

        let mut domains = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let domain: Domain = rmp_serde::from_slice(value.value())?;
            domains.push(domain);
        }

        Ok(domains)
    }

    /// The `user_only` domains a user has donated; each is a storage
    /// prefix the user owns for accounting purposes.
    pub fn get_donated_domains(&self, user_id: &str) -> Result<Vec<Domain>, DatabaseError> {
        let all = self.get_all_domains()?;
        Ok(all
            .into_iter()
            .filter(|d| d.user_only && d.donated_by.as_deref() == Some(user_id))
            .collect())
    }

    /// Remove a domain from the registry. Refused while any file record
    /// still lives under the domain's namespace; its objects would become
    /// unreachable to delete and wipe otherwise.
    pub fn remove_domain(&self, name: &str) -> Result<DomainRemoval, DatabaseError> {
        let write_txn = self.begin_write()?;

        let exists = {
            let table = write_txn.open_table(DOMAINS)?;
            let found = table.get(name)?.is_some();
            found
        };
        if !exists {
            write_txn.commit()?;
            return Ok(DomainRemoval::NotFound);
        }

        let in_use = {
            let table = write_txn.open_table(FILES)?;
            let mut referenced = false;
            for result in table.iter()? {
                let (_, value) = result?;
                let file: FileRecord = rmp_serde::from_slice(value.value())?;
                if file.domain == name {
                    referenced = true;
                    break;
                }
            }
            referenced
        };
        if in_use {
            write_txn.commit()?;
            return Ok(DomainRemoval::InUse);
        }

        {
            let mut table = write_txn.open_table(DOMAINS)?;
            table.remove(name)?;
        }
        write_txn.commit()?;
        Ok(DomainRemoval::Removed)
    }
}
