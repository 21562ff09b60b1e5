//! SSH module - brokers authenticated sessions to fleet hosts
//!
//! # Features
//! - Key-then-password authentication with typed failure causes
//! - Credentials decrypted through the vault per attempt, never cached
//! - Bounded connect and per-command timeouts
//! - Shell-safe builders for the config file commands

mod auth;
mod broker;
mod client;
mod command;
mod config;
mod error;
mod transport;

pub use auth::{describe_key, parse_private_key, KeyError};
pub use broker::{ConnectionBroker, DEFAULT_CONNECT_TIMEOUT};
pub use client::{fingerprint, ClientHandler, RusshSession, RusshTransport};
pub use command::{
    backup_path, shell_escape, RemoteCommand, CONNECTION_TEST_MARKER, EXISTS_MARKER,
    NOT_EXISTS_MARKER,
};
pub use config::{AuthMethodUsed, ConnectionDescriptor};
pub use error::{BrokerError, ConfigurationError, ConnectCause, SshError};
pub use transport::{Credential, Endpoint, ExecOutput, RemoteSession, Transport};
