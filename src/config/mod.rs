//! Configuration module
//!
//! Operator settings: vault key, database location, timeouts and deploy
//! defaults. Loaded once and passed into the vault, the store and the
//! workflows at construction time.

mod settings;
mod storage;

pub use settings::{Settings, DEFAULT_REMOTE_PATH, SETTINGS_VERSION, VAULT_KEY_ENV};
pub use storage::{config_dir, settings_file, SettingsError, SettingsStorage};
