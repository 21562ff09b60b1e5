//! Store persistence using redb
//!
//! Database: state.redb
//! Tables:
//!   - config_records: id -> ConfigRecord (MessagePack)
//!   - servers: id -> Server (MessagePack)
//!   - ssh_keys: id -> SshKeyCredential (MessagePack)
//!   - ssh_passwords: id -> SshPasswordCredential (MessagePack)
//!   - metadata: "version" -> u32, "next_id.<table>" -> u64

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition, TableHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::store::{CredentialStore, RecordStore, StoreError};
use super::types::{ConfigRecord, Entity, Server, SshKeyCredential, SshPasswordCredential};

/// Database version for migrations
pub const STATE_DB_VERSION: u32 = 1;

type Rows = TableDefinition<'static, u64, &'static [u8]>;

const RECORDS_TABLE: Rows = TableDefinition::new("config_records");
const SERVERS_TABLE: Rows = TableDefinition::new("servers");
const SSH_KEYS_TABLE: Rows = TableDefinition::new("ssh_keys");
const SSH_PASSWORDS_TABLE: Rows = TableDefinition::new("ssh_passwords");

const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// redb-backed implementation of both store traits
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the database at `path`
    ///
    /// A file redb cannot open is moved aside to `*.redb.backup` and a fresh
    /// database is created in its place.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = match Database::create(&path) {
            Ok(db) => {
                info!("State database opened at {:?}", path);
                db
            }
            Err(e) => {
                warn!("Failed to open state database: {:?}, attempting recovery", e);

                let backup_path = path.with_extension("redb.backup");
                if let Err(e) = std::fs::rename(&path, &backup_path) {
                    error!("Failed to backup corrupted state database: {:?}", e);
                } else {
                    info!("Backed up corrupted state database to {:?}", backup_path);
                }

                Database::create(&path)?
            }
        };

        // Credentials live here, even if sealed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                warn!("Failed to set state database permissions: {}", e);
            }
        }

        let store = Self {
            db: Arc::new(db),
            path,
        };
        store.initialize()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;

        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(SERVERS_TABLE)?;
            let _ = write_txn.open_table(SSH_KEYS_TABLE)?;
            let _ = write_txn.open_table(SSH_PASSWORDS_TABLE)?;

            let mut meta = write_txn.open_table(METADATA_TABLE)?;
            let existing = meta
                .get("version")?
                .and_then(|v| rmp_serde::from_slice::<u32>(v.value()).ok());

            match existing {
                Some(version) if version > STATE_DB_VERSION => {
                    return Err(StoreError::UnsupportedVersion {
                        found: version,
                        supported: STATE_DB_VERSION,
                    });
                }
                Some(version) if version == STATE_DB_VERSION => {}
                _ => {
                    let version_bytes = rmp_serde::to_vec(&STATE_DB_VERSION)?;
                    meta.insert("version", version_bytes.as_slice())?;
                }
            }
        }

        write_txn.commit()?;
        debug!("State store initialized");
        Ok(())
    }

    fn get_row<T: DeserializeOwned>(&self, table: Rows, id: u64) -> Result<Option<T>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;

        match table.get(id)? {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn put_row<T: Entity + Serialize>(&self, table: Rows, mut row: T) -> Result<T, StoreError> {
        let counter_key = format!("next_id.{}", table.name());
        let write_txn = self.db.begin_write()?;

        {
            let mut rows = write_txn.open_table(table)?;
            let mut meta = write_txn.open_table(METADATA_TABLE)?;

            let stored_next = match meta.get(counter_key.as_str())? {
                Some(v) => rmp_serde::from_slice::<u64>(v.value())?,
                None => 1,
            };
            let next = stored_next.max(rows.last()?.map(|(k, _)| k.value() + 1).unwrap_or(1));

            if row.id() == 0 {
                row.set_id(next);
            }

            let bytes = rmp_serde::to_vec_named(&row)?;
            rows.insert(row.id(), bytes.as_slice())?;

            let counter = rmp_serde::to_vec(&next.max(row.id() + 1))?;
            meta.insert(counter_key.as_str(), counter.as_slice())?;
        }

        write_txn.commit()?;
        debug!("Stored row {} in {}", row.id(), table.name());
        Ok(row)
    }

    fn delete_row(&self, table: Rows, id: u64) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;

        let removed = {
            let mut rows = write_txn.open_table(table)?;
            let removed = rows.remove(id)?.is_some();
            removed
        };

        write_txn.commit()?;
        if removed {
            debug!("Deleted row {} from {}", id, table.name());
        }
        Ok(removed)
    }

    fn all_rows<T: DeserializeOwned>(&self, table: Rows) -> Result<Vec<T>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            rows.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(rows)
    }
}

impl RecordStore for RedbStore {
    fn get(&self, id: u64) -> Result<Option<ConfigRecord>, StoreError> {
        self.get_row(RECORDS_TABLE, id)
    }

    fn put(&self, record: ConfigRecord) -> Result<ConfigRecord, StoreError> {
        self.put_row(RECORDS_TABLE, record)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<ConfigRecord>, StoreError> {
        Ok(self
            .all_rows::<ConfigRecord>(RECORDS_TABLE)?
            .into_iter()
            .find(|r| r.name == name))
    }

    fn list(&self) -> Result<Vec<ConfigRecord>, StoreError> {
        self.all_rows(RECORDS_TABLE)
    }

    fn delete(&self, id: u64) -> Result<bool, StoreError> {
        self.delete_row(RECORDS_TABLE, id)
    }
}

impl CredentialStore for RedbStore {
    fn server(&self, id: u64) -> Result<Option<Server>, StoreError> {
        self.get_row(SERVERS_TABLE, id)
    }

    fn ssh_key(&self, id: u64) -> Result<Option<SshKeyCredential>, StoreError> {
        self.get_row(SSH_KEYS_TABLE, id)
    }

    fn ssh_password(&self, id: u64) -> Result<Option<SshPasswordCredential>, StoreError> {
        self.get_row(SSH_PASSWORDS_TABLE, id)
    }

    fn put_server(&self, server: Server) -> Result<Server, StoreError> {
        self.put_row(SERVERS_TABLE, server)
    }

    fn put_ssh_key(&self, credential: SshKeyCredential) -> Result<SshKeyCredential, StoreError> {
        self.put_row(SSH_KEYS_TABLE, credential)
    }

    fn put_ssh_password(
        &self,
        credential: SshPasswordCredential,
    ) -> Result<SshPasswordCredential, StoreError> {
        self.put_row(SSH_PASSWORDS_TABLE, credential)
    }

    fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        self.all_rows(SERVERS_TABLE)
    }

    fn list_ssh_keys(&self) -> Result<Vec<SshKeyCredential>, StoreError> {
        self.all_rows(SSH_KEYS_TABLE)
    }

    fn list_ssh_passwords(&self) -> Result<Vec<SshPasswordCredential>, StoreError> {
        self.all_rows(SSH_PASSWORDS_TABLE)
    }

    fn delete_server(&self, id: u64) -> Result<bool, StoreError> {
        self.delete_row(SERVERS_TABLE, id)
    }

    fn delete_ssh_key(&self, id: u64) -> Result<bool, StoreError> {
        self.delete_row(SSH_KEYS_TABLE, id)
    }

    fn delete_ssh_password(&self, id: u64) -> Result<bool, StoreError> {
        self.delete_row(SSH_PASSWORDS_TABLE, id)
    }
}
