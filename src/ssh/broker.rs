//! Connection Broker
//!
//! Turns a [`ConnectionDescriptor`] into an authenticated session. Methods are
//! tried in a fixed order:
//!
//! 1. private key, if present
//! 2. password, if present
//!
//! A failed key attempt is soft when a password follows it and fatal
//! otherwise. A descriptor with neither credential never touches the network.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::auth::{parse_private_key, KeyError};
use super::config::{AuthMethodUsed, ConnectionDescriptor};
use super::error::{BrokerError, ConfigurationError, ConnectCause, SshError};
use super::transport::{Credential, Endpoint, RemoteSession, Transport};
use crate::vault::{CredentialVault, VaultError};

/// Default bound on connect + authenticate
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time the outer guard allows a transport to tear down after its own
/// deadline fired
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// One authentication method in the priority list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStrategy {
    Key,
    Password,
}

/// Priority order, no override
const STRATEGIES: [AuthStrategy; 2] = [AuthStrategy::Key, AuthStrategy::Password];

/// Why a single strategy did not yield a session
#[derive(Debug)]
enum AttemptFailure {
    Decrypt(VaultError),
    Key(KeyError),
    Transport(SshError),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Decrypt(e) => write!(f, "{}", e),
            AttemptFailure::Key(e) => write!(f, "{}", e),
            AttemptFailure::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl AuthStrategy {
    fn applies(self, descriptor: &ConnectionDescriptor) -> bool {
        match self {
            AuthStrategy::Key => descriptor.has_private_key(),
            AuthStrategy::Password => descriptor.has_password(),
        }
    }

    fn method(self) -> AuthMethodUsed {
        match self {
            AuthStrategy::Key => AuthMethodUsed::Key,
            AuthStrategy::Password => AuthMethodUsed::Password,
        }
    }

    /// Decrypt (and for keys, parse) the credential this strategy uses
    fn credential(
        self,
        vault: &CredentialVault,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Credential, AttemptFailure> {
        match self {
            AuthStrategy::Key => {
                let sealed = descriptor.encrypted_private_key.as_deref().unwrap_or_default();
                let text = vault.resolve(sealed).map_err(AttemptFailure::Decrypt)?;
                let key = parse_private_key(&text).map_err(AttemptFailure::Key)?;
                Ok(Credential::PrivateKey(Arc::new(key)))
            }
            AuthStrategy::Password => {
                let sealed = descriptor.encrypted_password.as_deref().unwrap_or_default();
                let password = vault.resolve(sealed).map_err(AttemptFailure::Decrypt)?;
                Ok(Credential::Password(password))
            }
        }
    }

    /// Error reported when this strategy was the last one to try
    fn fatal(self, failure: AttemptFailure, timeout: Duration) -> BrokerError {
        match (self, failure) {
            (_, AttemptFailure::Decrypt(e)) => BrokerError::Decryption(e),
            (_, AttemptFailure::Transport(SshError::Timeout(_))) => {
                BrokerError::connection(ConnectCause::Timeout {
                    secs: timeout.as_secs(),
                })
            }
            (AuthStrategy::Key, failure) => BrokerError::connection(ConnectCause::KeyAuthFailed {
                reason: failure.to_string(),
            }),
            (AuthStrategy::Password, AttemptFailure::Transport(SshError::AuthRejected(_))) => {
                BrokerError::connection(ConnectCause::AuthRejected {
                    method: AuthMethodUsed::Password,
                })
            }
            (AuthStrategy::Password, failure) => {
                BrokerError::connection(ConnectCause::PasswordAuthFailed {
                    reason: failure.to_string(),
                })
            }
        }
    }
}

/// Produces authenticated sessions from descriptors
#[derive(Clone)]
pub struct ConnectionBroker {
    vault: CredentialVault,
    transport: Arc<dyn Transport>,
    connect_timeout: Duration,
}

impl ConnectionBroker {
    pub fn new(vault: CredentialVault, transport: Arc<dyn Transport>) -> Self {
        Self {
            vault,
            transport,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Open a session, reporting which method authenticated it
    pub async fn open(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(Box<dyn RemoteSession>, AuthMethodUsed), BrokerError> {
        descriptor.check()?;

        let endpoint = Endpoint {
            host: descriptor.host.clone(),
            port: descriptor.port,
            username: descriptor.username.clone(),
        };

        let strategies: Vec<AuthStrategy> = STRATEGIES
            .into_iter()
            .filter(|s| s.applies(descriptor))
            .collect();

        for (index, strategy) in strategies.iter().copied().enumerate() {
            let has_fallback = index + 1 < strategies.len();

            match self.attempt(strategy, descriptor, &endpoint).await {
                Ok(session) => {
                    info!(
                        "Broker opened {} via {} authentication",
                        descriptor.address(),
                        strategy.method()
                    );
                    return Ok((session, strategy.method()));
                }
                Err(failure) if has_fallback => {
                    warn!(
                        "{} authentication to {} failed ({}), falling back",
                        strategy.method(),
                        descriptor.address(),
                        failure
                    );
                }
                Err(failure) => {
                    warn!(
                        "{} authentication to {} failed: {}",
                        strategy.method(),
                        descriptor.address(),
                        failure
                    );
                    return Err(strategy.fatal(failure, self.connect_timeout));
                }
            }
        }

        // check() guarantees at least one strategy applies
        Err(ConfigurationError::NoCredentials.into())
    }

    async fn attempt(
        &self,
        strategy: AuthStrategy,
        descriptor: &ConnectionDescriptor,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn RemoteSession>, AttemptFailure> {
        let credential = strategy.credential(&self.vault, descriptor)?;

        // Outer bound in case a transport ignores its own timeout
        match tokio::time::timeout(
            self.connect_timeout + TEARDOWN_GRACE,
            self.transport
                .connect(endpoint, &credential, self.connect_timeout),
        )
        .await
        {
            Ok(result) => result.map_err(AttemptFailure::Transport),
            Err(_) => Err(AttemptFailure::Transport(SshError::Timeout(
                "Connection timed out".to_string(),
            ))),
        }
    }
}

impl std::fmt::Debug for ConnectionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBroker")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
