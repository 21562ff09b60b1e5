//! Private key parsing
//!
//! Keys arrive as decrypted text from the vault (OpenSSH or PEM encoding):
//! - RSA keys
//! - Ed25519 keys
//! - ECDSA keys

use russh::keys::PrivateKey;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during key parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key material is empty")]
    Empty,

    #[error("Encrypted key requires passphrase")]
    PassphraseRequired,

    #[error("Failed to parse key: {0}")]
    ParseError(String),
}

/// Decode key text into a usable private key
pub fn parse_private_key(text: &str) -> Result<PrivateKey, KeyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KeyError::Empty);
    }

    // Stored keys carry no passphrase
    if text.contains("Proc-Type: 4,ENCRYPTED") || text.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        return Err(KeyError::PassphraseRequired);
    }

    let key = russh::keys::decode_secret_key(text, None)
        .map_err(|e| KeyError::ParseError(e.to_string()))?;

    debug!("Parsed {} private key", describe_key(&key));
    Ok(key)
}

/// Get key type description
pub fn describe_key(key: &PrivateKey) -> String {
    key.algorithm().to_string()
}
