//! Transport seam between the broker and the wire
//!
//! [`Transport`] opens one authenticated session per call; [`RemoteSession`]
//! runs commands over it sequentially. The russh implementation lives in
//! `client.rs`; tests substitute a scripted transport.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::PrivateKey;
use zeroize::Zeroizing;

use super::config::AuthMethodUsed;
use super::error::SshError;

/// Plaintext credential for a single authentication attempt
pub enum Credential {
    PrivateKey(Arc<PrivateKey>),
    Password(Zeroizing<String>),
}

impl Credential {
    pub fn method(&self) -> AuthMethodUsed {
        match self {
            Credential::PrivateKey(_) => AuthMethodUsed::Key,
            Credential::Password(_) => AuthMethodUsed::Password,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::PrivateKey(key) => write!(f, "Credential::PrivateKey({})", key.algorithm()),
            Credential::Password(_) => f.write_str("Credential::Password(..)"),
        }
    }
}

/// Host, port and user for one connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
}

/// Output of one remote command
///
/// stdout is kept as received; remote files are not guaranteed to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    /// Decoded lossily, diagnostics only
    pub stderr: String,
    /// `None` when the channel closed without reporting a status
    pub exit_code: Option<u32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout as text, failing on invalid UTF-8
    pub fn stdout_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.stdout)
    }

    /// stdout for display and marker comparison
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate with exactly one credential
    ///
    /// Implementations must release anything they opened before returning
    /// an error. A server refusing the credential is [`SshError::AuthRejected`].
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SshError>;
}

#[async_trait]
pub trait RemoteSession: Send {
    async fn run(&mut self, command: &str, timeout: Duration) -> Result<ExecOutput, SshError>;

    /// Idempotent
    async fn close(&mut self);
}

impl std::fmt::Debug for dyn RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RemoteSession")
    }
}
