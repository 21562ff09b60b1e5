//! In-memory store for tests and embedding

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::store::{CredentialStore, RecordStore, StoreError};
use super::types::{ConfigRecord, Entity, Server, SshKeyCredential, SshPasswordCredential};

struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T: Entity + Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn get(&self, id: u64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn put(&mut self, mut row: T) -> T {
        if row.id() == 0 {
            row.set_id(self.next_id);
        }
        self.next_id = self.next_id.max(row.id() + 1);
        self.rows.insert(row.id(), row.clone());
        row
    }

    fn all(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn delete(&mut self, id: u64) -> bool {
        self.rows.remove(&id).is_some()
    }
}

/// `parking_lot::RwLock`-guarded maps
pub struct MemoryStore {
    records: RwLock<Table<ConfigRecord>>,
    servers: RwLock<Table<Server>>,
    ssh_keys: RwLock<Table<SshKeyCredential>>,
    ssh_passwords: RwLock<Table<SshPasswordCredential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Table::new()),
            servers: RwLock::new(Table::new()),
            ssh_keys: RwLock::new(Table::new()),
            ssh_passwords: RwLock::new(Table::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: u64) -> Result<Option<ConfigRecord>, StoreError> {
        Ok(self.records.read().get(id))
    }

    fn put(&self, record: ConfigRecord) -> Result<ConfigRecord, StoreError> {
        Ok(self.records.write().put(record))
    }

    fn find_by_name(&self, name: &str) -> Result<Option<ConfigRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .rows
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    fn list(&self) -> Result<Vec<ConfigRecord>, StoreError> {
        Ok(self.records.read().all())
    }

    fn delete(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.records.write().delete(id))
    }
}

impl CredentialStore for MemoryStore {
    fn server(&self, id: u64) -> Result<Option<Server>, StoreError> {
        Ok(self.servers.read().get(id))
    }

    fn ssh_key(&self, id: u64) -> Result<Option<SshKeyCredential>, StoreError> {
        Ok(self.ssh_keys.read().get(id))
    }

    fn ssh_password(&self, id: u64) -> Result<Option<SshPasswordCredential>, StoreError> {
        Ok(self.ssh_passwords.read().get(id))
    }

    fn put_server(&self, server: Server) -> Result<Server, StoreError> {
        Ok(self.servers.write().put(server))
    }

    fn put_ssh_key(&self, credential: SshKeyCredential) -> Result<SshKeyCredential, StoreError> {
        Ok(self.ssh_keys.write().put(credential))
    }

    fn put_ssh_password(
        &self,
        credential: SshPasswordCredential,
    ) -> Result<SshPasswordCredential, StoreError> {
        Ok(self.ssh_passwords.write().put(credential))
    }

    fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        Ok(self.servers.read().all())
    }

    fn list_ssh_keys(&self) -> Result<Vec<SshKeyCredential>, StoreError> {
        Ok(self.ssh_keys.read().all())
    }

    fn list_ssh_passwords(&self) -> Result<Vec<SshPasswordCredential>, StoreError> {
        Ok(self.ssh_passwords.read().all())
    }

    fn delete_server(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.servers.write().delete(id))
    }

    fn delete_ssh_key(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.ssh_keys.write().delete(id))
    }

    fn delete_ssh_password(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.ssh_passwords.write().delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::TargetRef;

    #[test]
    fn test_put_allocates_ids() {
        let store = MemoryStore::new();
        let target = TargetRef::Server { server_id: 1 };

        let a = store.put(ConfigRecord::new("a", target, "/etc/XrayR/config.yml")).unwrap();
        let b = store.put(ConfigRecord::new("b", target, "/etc/XrayR/config.yml")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let mut renamed = a.clone();
        renamed.name = "a2".to_string();
        store.put(renamed).unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.get(1).unwrap().unwrap().name, "a2");
        assert!(store.find_by_name("a").unwrap().is_none());
        assert_eq!(store.find_by_name("b").unwrap().unwrap().id, 2);
    }

    #[test]
    fn test_explicit_id_advances_counter() {
        let store = MemoryStore::new();
        let mut record = ConfigRecord::new("x", TargetRef::Server { server_id: 1 }, "/p");
        record.id = 10;
        store.put(record).unwrap();

        let next = store
            .put(ConfigRecord::new("y", TargetRef::Server { server_id: 1 }, "/p"))
            .unwrap();
        assert_eq!(next.id, 11);
    }

    #[test]
    fn test_delete_does_not_reuse_ids() {
        let store = MemoryStore::new();
        let target = TargetRef::Server { server_id: 1 };

        store.put(ConfigRecord::new("a", target, "/p")).unwrap();
        let b = store.put(ConfigRecord::new("b", target, "/p")).unwrap();

        assert!(store.delete(b.id).unwrap());
        assert!(!store.delete(b.id).unwrap());
        assert!(store.get(b.id).unwrap().is_none());

        let c = store.put(ConfigRecord::new("c", target, "/p")).unwrap();
        assert_eq!(c.id, 3);
        assert_eq!(
            store.list().unwrap().iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_credential_listing_and_delete() {
        let store = MemoryStore::new();
        for name in ["one", "two"] {
            store
                .put_ssh_password(SshPasswordCredential {
                    id: 0,
                    name: name.to_string(),
                    hostname: "h".to_string(),
                    port: 22,
                    username: "root".to_string(),
                    encrypted_password: "v1:p".to_string(),
                })
                .unwrap();
        }

        assert!(store.delete_ssh_password(1).unwrap());
        let names: Vec<_> = store
            .list_ssh_passwords()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["two"]);
        assert!(store.list_servers().unwrap().is_empty());
        assert!(!store.delete_server(1).unwrap());
        assert!(!store.delete_ssh_key(1).unwrap());
        assert!(store.list_ssh_keys().unwrap().is_empty());
    }
}
