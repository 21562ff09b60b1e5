//! Authenticated encryption for credentials at rest
//!
//! Sealed blobs are text so they can live in any column or JSON field:
//!
//! ```text
//! v1:<base64(nonce[12] || ciphertext || tag[16])>
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use super::error::VaultError;

/// Prefix identifying the blob layout
const BLOB_PREFIX: &str = "v1:";

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Symmetric primitive used to protect credentials at rest.
///
/// Implementations must be deterministic in what they accept: a blob produced
/// by `encrypt` with one key decrypts only with that same key.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError>;

    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>, VaultError>;
}

/// 256-bit vault key, wiped on drop
#[derive(Clone)]
pub struct VaultKey(Zeroizing<[u8; KEY_LEN]>);

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a base64-encoded 32-byte key (the form stored in settings)
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let raw = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| VaultError::InvalidKey(format!("not base64: {}", e)))?,
        );
        if raw.len() != KEY_LEN {
            return Err(VaultError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                raw.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&raw);
        Ok(Self(key))
    }

    /// Generate a fresh random key using the OS RNG
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut *key);
        Self(key)
    }

    /// Derive a key from an operator passphrase with Argon2id
    ///
    /// 64 MiB, 3 iterations, single lane.
    pub fn from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, VaultError> {
        let params = Params::new(65536, 3, 1, Some(KEY_LEN))
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut *key)
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        Ok(Self(key))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&*self.0)
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// ChaCha20-Poly1305 implementation of [`SecretCipher`]
pub struct ChaChaCipher {
    key: VaultKey,
}

impl ChaChaCipher {
    pub fn new(key: VaultKey) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, VaultError> {
        ChaCha20Poly1305::new_from_slice(&*self.key.0)
            .map_err(|_| VaultError::InvalidKey("key length rejected by cipher".to_string()))
    }
}

impl SecretCipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        // ChaCha20Poly1305 appends the 16-byte tag to the ciphertext
        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| VaultError::Encryption)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);

        Ok(format!("{}{}", BLOB_PREFIX, BASE64.encode(blob)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>, VaultError> {
        let encoded = ciphertext
            .trim()
            .strip_prefix(BLOB_PREFIX)
            .ok_or_else(|| VaultError::Decryption("unrecognized blob format".to_string()))?;

        let blob = BASE64
            .decode(encoded)
            .map_err(|e| VaultError::Decryption(format!("invalid base64: {}", e)))?;

        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Decryption("blob too short".to_string()));
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.cipher()?
                .decrypt(Nonce::from_slice(nonce), sealed)
                .map_err(|_| {
                    VaultError::Decryption("wrong key or corrupted data".to_string())
                })?,
        );

        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| VaultError::Decryption("plaintext is not UTF-8".to_string()))?;
        Ok(Zeroizing::new(text.to_string()))
    }
}
