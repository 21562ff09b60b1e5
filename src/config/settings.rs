//! Operator settings

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::storage::{config_dir, SettingsError};
use crate::state::RedbStore;
use crate::vault::{CredentialVault, VaultKey};

/// Current settings file version
pub const SETTINGS_VERSION: u32 = 1;

/// Overrides `vault_key` when set
pub const VAULT_KEY_ENV: &str = "XRAYR_FLEET_VAULT_KEY";

pub const DEFAULT_REMOTE_PATH: &str = "/etc/XrayR/config.yml";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,

    /// Base64 of the 32-byte vault key
    pub vault_key: Option<String>,

    /// `<config_dir>/xrayr-fleet/state.redb` when unset
    pub database_path: Option<PathBuf>,

    pub connect_timeout_secs: u64,

    pub command_timeout_secs: u64,

    /// Remote path for records registered without one
    pub default_remote_path: String,

    pub backup_before_deploy: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            vault_key: None,
            database_path: None,
            connect_timeout_secs: 30,
            command_timeout_secs: 30,
            default_remote_path: DEFAULT_REMOTE_PATH.to_string(),
            backup_before_deploy: true,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("version", &self.version)
            .field("vault_key", &self.vault_key.as_ref().map(|_| "<redacted>"))
            .field("database_path", &self.database_path)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("default_remote_path", &self.default_remote_path)
            .field("backup_before_deploy", &self.backup_before_deploy)
            .finish()
    }
}

impl Settings {
    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        self.override_vault_key(std::env::var(VAULT_KEY_ENV).ok());
    }

    fn override_vault_key(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            tracing::info!("Vault key taken from {}", VAULT_KEY_ENV);
            self.vault_key = Some(key);
        }
    }

    pub fn vault_key(&self) -> Result<VaultKey, SettingsError> {
        let encoded = self
            .vault_key
            .as_deref()
            .ok_or(SettingsError::MissingVaultKey)?;
        Ok(VaultKey::from_base64(encoded)?)
    }

    pub fn vault(&self) -> Result<CredentialVault, SettingsError> {
        Ok(CredentialVault::with_key(self.vault_key()?))
    }

    pub fn database_path(&self) -> Result<PathBuf, SettingsError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("state.redb")),
        }
    }

    pub fn open_store(&self) -> Result<RedbStore, SettingsError> {
        Ok(RedbStore::open(self.database_path()?)?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
