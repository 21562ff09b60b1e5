//! SSH Error types

use thiserror::Error;

use super::config::AuthMethodUsed;
use crate::vault::VaultError;

/// Transport-level failures reported by a [`Transport`](super::Transport) or
/// a [`RemoteSession`](super::RemoteSession)
#[derive(Error, Debug)]
pub enum SshError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered and refused the credential
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("SSH protocol error: {0}")]
    ProtocolError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Disconnected")]
    Disconnected,
}

impl SshError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SshError::Timeout(_))
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::ProtocolError(err.to_string())
    }
}

/// A descriptor or target that cannot be used as given. Needs an operator fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No credentials: a private key or a password is required")]
    NoCredentials,

    #[error("Host must not be empty")]
    EmptyHost,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Invalid port {0}: expected 1-65535")]
    InvalidPort(u16),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: u64 },
}

/// Why the broker could not produce a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectCause {
    #[error("key authentication failed: {reason}")]
    KeyAuthFailed { reason: String },

    #[error("password authentication failed: {reason}")]
    PasswordAuthFailed { reason: String },

    #[error("{method} credentials rejected by server")]
    AuthRejected { method: AuthMethodUsed },

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Connection error: {cause}")]
    Connection { cause: ConnectCause },

    #[error("Decryption error: {0}")]
    Decryption(#[from] VaultError),
}

impl BrokerError {
    pub(crate) fn connection(cause: ConnectCause) -> Self {
        BrokerError::Connection { cause }
    }

    /// Only connection failures are worth a fresh attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Connection { .. })
    }
}
