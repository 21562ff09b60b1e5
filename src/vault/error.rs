//! Vault error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Blob is malformed or was sealed with different key material
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed")]
    Encryption,

    #[error("Invalid vault key: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}
