//! Settings Storage
//!
//! Handles reading/writing the settings file to disk.
//! Location: `<config_dir>/xrayr-fleet/settings.json`

use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::settings::{Settings, SETTINGS_VERSION};
use crate::state::StoreError;
use crate::vault::VaultError;

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("No vault key configured")]
    MissingVaultKey,

    #[error("Invalid vault key: {0}")]
    InvalidVaultKey(#[from] VaultError),

    #[error("Failed to open state store: {0}")]
    Store(#[from] StoreError),
}

/// Get the xrayr-fleet configuration directory
pub fn config_dir() -> Result<PathBuf, SettingsError> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|dir| dir.join("xrayr-fleet"))
        .ok_or(SettingsError::NoConfigDir)
}

/// Get the settings file path
pub fn settings_file() -> Result<PathBuf, SettingsError> {
    Ok(config_dir()?.join("settings.json"))
}

/// Settings storage manager
pub struct SettingsStorage {
    path: PathBuf,
}

impl SettingsStorage {
    /// Create a new storage manager with default path
    pub fn new() -> Result<Self, SettingsError> {
        Ok(Self {
            path: settings_file()?,
        })
    }

    /// Create storage manager with custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    async fn ensure_dir(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Load settings from disk
    /// Returns defaults if the file doesn't exist
    /// If the file is corrupted, backs it up and returns defaults
    pub async fn load(&self) -> Result<Settings, SettingsError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    if settings.version > SETTINGS_VERSION {
                        return Err(SettingsError::VersionTooNew {
                            found: settings.version,
                            supported: SETTINGS_VERSION,
                        });
                    }
                    Ok(settings)
                }
                Err(e) => {
                    tracing::warn!("Settings file corrupted: {}", e);

                    match self.backup().await {
                        Ok(backup_path) => {
                            tracing::warn!(
                                "Corrupted settings backed up to {:?}, using defaults",
                                backup_path
                            );
                        }
                        Err(backup_err) => {
                            tracing::error!("Failed to backup corrupted settings: {}", backup_err);
                        }
                    }

                    Ok(Settings::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(SettingsError::Io(e)),
        }
    }

    /// Load, then apply environment overrides
    pub async fn load_with_env(&self) -> Result<Settings, SettingsError> {
        let mut settings = self.load().await?;
        settings.apply_env();
        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.ensure_dir().await?;

        // Write to temp file first, then rename (atomic write)
        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(settings)?;

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        // Holds the vault key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await
            {
                tracing::warn!("Failed to set settings file permissions: {}", e);
            }
        }

        Ok(())
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create a backup of the current settings file
    pub async fn backup(&self) -> Result<PathBuf, SettingsError> {
        let backup_path = self.path.with_extension(format!(
            "json.backup.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));

        if self.exists().await {
            fs::copy(&self.path, &backup_path).await?;
        }

        Ok(backup_path)
    }
}
