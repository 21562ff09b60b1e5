//! xrayr-fleet - manage XrayR node configuration on remote hosts
//!
//! Pulls `config.yml` over SSH, reduces it to an editable form, validates it
//! and renders it back before writing it to the host.

pub mod config;
pub mod ssh;
pub mod state;
pub mod vault;
pub mod workflow;
pub mod xrayr;

#[cfg(test)]
mod testing;

pub use config::{Settings, SettingsStorage};
pub use ssh::{ConnectionBroker, RusshTransport};
pub use state::{ConfigRecord, MemoryStore, RedbStore, TargetRef};
pub use vault::{CredentialVault, VaultKey};
pub use workflow::{Workflow, WorkflowError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging (`RUST_LOG`, default `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
