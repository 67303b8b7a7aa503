pub mod db;
mod domains;
mod files;
mod invites;
pub mod models;
mod tables;
mod urls;
mod users;

pub use db::{Database, DatabaseError};
pub use domains::DomainRemoval;
pub use files::{RemovedFile, WipedRecords};
pub use tables::*;
