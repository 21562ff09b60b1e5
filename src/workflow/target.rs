//! Target resolution: record target -> connection descriptor

use tracing::debug;

use super::stage::FailureKind;
use crate::ssh::{ConfigurationError, ConnectionDescriptor};
use crate::state::{CredentialKind, CredentialStore, TargetRef};

/// Look up the credential a target points at
///
/// A dangling reference is a configuration error, never a connection error.
pub fn resolve_target<S>(store: &S, target: TargetRef) -> Result<ConnectionDescriptor, FailureKind>
where
    S: CredentialStore + ?Sized,
{
    let descriptor = match target {
        TargetRef::Server { server_id } => store
            .server(server_id)?
            .ok_or(ConfigurationError::NotFound {
                what: "server",
                id: server_id,
            })?
            .descriptor(),
        TargetRef::Credential {
            credential_id,
            kind: CredentialKind::Key,
        } => store
            .ssh_key(credential_id)?
            .ok_or(ConfigurationError::NotFound {
                what: "ssh key",
                id: credential_id,
            })?
            .descriptor(),
        TargetRef::Credential {
            credential_id,
            kind: CredentialKind::Password,
        } => store
            .ssh_password(credential_id)?
            .ok_or(ConfigurationError::NotFound {
                what: "ssh password",
                id: credential_id,
            })?
            .descriptor(),
    };

    debug!("Resolved {:?} to {}", target, descriptor.address());
    Ok(descriptor)
}
