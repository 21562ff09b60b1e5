//! Store interfaces
//!
//! Keyed by numeric id. `put` with `id == 0` allocates the next id; any
//! other id inserts or replaces that entity. Ids of deleted rows are not
//! handed out again.

#![allow(clippy::result_large_err)]

use thiserror::Error;

use super::types::{ConfigRecord, Server, SshKeyCredential, SshPasswordCredential};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported database version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Configuration records
pub trait RecordStore: Send + Sync {
    fn get(&self, id: u64) -> Result<Option<ConfigRecord>, StoreError>;

    fn put(&self, record: ConfigRecord) -> Result<ConfigRecord, StoreError>;

    fn find_by_name(&self, name: &str) -> Result<Option<ConfigRecord>, StoreError>;

    /// Ordered by id
    fn list(&self) -> Result<Vec<ConfigRecord>, StoreError>;

    /// `true` if a record was removed
    fn delete(&self, id: u64) -> Result<bool, StoreError>;
}

/// Servers and named credentials
pub trait CredentialStore: Send + Sync {
    fn server(&self, id: u64) -> Result<Option<Server>, StoreError>;

    fn ssh_key(&self, id: u64) -> Result<Option<SshKeyCredential>, StoreError>;

    fn ssh_password(&self, id: u64) -> Result<Option<SshPasswordCredential>, StoreError>;

    fn put_server(&self, server: Server) -> Result<Server, StoreError>;

    fn put_ssh_key(&self, credential: SshKeyCredential) -> Result<SshKeyCredential, StoreError>;

    fn put_ssh_password(
        &self,
        credential: SshPasswordCredential,
    ) -> Result<SshPasswordCredential, StoreError>;

    /// Listings are ordered by id
    fn list_servers(&self) -> Result<Vec<Server>, StoreError>;

    fn list_ssh_keys(&self) -> Result<Vec<SshKeyCredential>, StoreError>;

    fn list_ssh_passwords(&self) -> Result<Vec<SshPasswordCredential>, StoreError>;

    /// Deletes return `true` if a row was removed. Records that reference
    /// the row are left alone and fail to resolve afterwards.
    fn delete_server(&self, id: u64) -> Result<bool, StoreError>;

    fn delete_ssh_key(&self, id: u64) -> Result<bool, StoreError>;

    fn delete_ssh_password(&self, id: u64) -> Result<bool, StoreError>;
}
