//! Persisted entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ssh::ConnectionDescriptor;
use crate::xrayr::SimplifiedConfig;

/// Host with its own credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// 0 until stored
    pub id: u64,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub encrypted_private_key: Option<String>,
    pub encrypted_password: Option<String>,
    pub description: Option<String>,
}

impl Server {
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: self.hostname.clone(),
            port: self.port,
            username: self.username.clone(),
            encrypted_private_key: self.encrypted_private_key.clone(),
            encrypted_password: self.encrypted_password.clone(),
        }
    }
}

/// Named key credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyCredential {
    pub id: u64,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub encrypted_private_key: String,
}

impl SshKeyCredential {
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::new(&self.hostname, self.port, &self.username)
            .with_private_key(&self.encrypted_private_key)
    }
}

/// Named password credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshPasswordCredential {
    pub id: u64,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub encrypted_password: String,
}

impl SshPasswordCredential {
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::new(&self.hostname, self.port, &self.username)
            .with_password(&self.encrypted_password)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Key,
    Password,
}

/// Where a record's host and credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetRef {
    /// Direct host credential
    Server { server_id: u64 },
    /// Indirection through a named credential
    Credential {
        credential_id: u64,
        kind: CredentialKind,
    },
}

/// A managed XrayR config file on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// 0 until stored
    pub id: u64,
    /// Unique across records
    pub name: String,
    pub target: TargetRef,
    pub remote_path: String,
    pub description: Option<String>,
    /// Text read by the last successful sync
    pub raw_text: Option<String>,
    pub simplified: Option<SimplifiedConfig>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigRecord {
    pub fn new(name: impl Into<String>, target: TargetRef, remote_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            target,
            remote_path: remote_path.into(),
            description: None,
            raw_text: None,
            simplified: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Entities addressed by numeric id
pub(crate) trait Entity {
    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> u64 {
                    self.id
                }

                fn set_id(&mut self, id: u64) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_entity!(Server, SshKeyCredential, SshPasswordCredential, ConfigRecord);
