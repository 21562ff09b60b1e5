//! State persistence using redb + MessagePack (rmp-serde)
//! Holds configuration records, servers and named SSH credentials

mod memory;
mod redb_store;
mod store;
mod types;

pub use memory::MemoryStore;
pub use redb_store::{RedbStore, STATE_DB_VERSION};
pub use store::{CredentialStore, RecordStore, StoreError};
pub use types::{
    ConfigRecord, CredentialKind, Server, SshKeyCredential, SshPasswordCredential, TargetRef,
};
