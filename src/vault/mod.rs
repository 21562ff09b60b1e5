//! Credential Vault
//!
//! Resolves encrypted credential blobs into plaintext on demand. Plaintext is
//! handed out as [`Zeroizing`] so it is wiped as soon as the caller drops it;
//! nothing is cached between calls.

mod cipher;
mod error;

use std::sync::Arc;

use zeroize::Zeroizing;

pub use cipher::{ChaChaCipher, SecretCipher, VaultKey, KEY_LEN};
pub use error::VaultError;

/// Thin wrapper over a [`SecretCipher`]
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Arc<dyn SecretCipher>,
}

impl CredentialVault {
    pub fn new(cipher: Arc<dyn SecretCipher>) -> Self {
        Self { cipher }
    }

    /// Vault backed by ChaCha20-Poly1305 with the given key
    pub fn with_key(key: VaultKey) -> Self {
        Self::new(Arc::new(ChaChaCipher::new(key)))
    }

    /// Decrypt a stored blob
    pub fn resolve(&self, encrypted: &str) -> Result<Zeroizing<String>, VaultError> {
        let plaintext = self.cipher.decrypt(encrypted)?;
        tracing::debug!("Vault resolved secret (length: {})", plaintext.len());
        Ok(plaintext)
    }

    /// Encrypt a secret for storage
    pub fn seal(&self, plaintext: &str) -> Result<String, VaultError> {
        self.cipher.encrypt(plaintext)
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}
