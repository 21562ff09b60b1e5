//! Sync / Deploy workflows
//!
//! Each operation is a short linear sequence of [`Stage`]s. The first failing
//! stage ends the run and is reported together with its cause. A session is
//! opened per call, used for sequential commands only, and closed on every
//! exit path before the call returns.

mod deploy;
mod probe;
mod registry;
mod stage;
mod sync;
mod target;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Settings, SettingsError, DEFAULT_REMOTE_PATH};
use crate::ssh::{
    AuthMethodUsed, ConnectionBroker, ConnectionDescriptor, ExecOutput, RemoteCommand,
    RemoteSession, Transport,
};
use crate::state::{ConfigRecord, CredentialStore, RecordStore, TargetRef};

pub use deploy::{DeployOptions, DeployOutcome};
pub use probe::EXECUTE_TIMEOUT_RANGE_SECS;
pub use stage::{ErrorCategory, FailureKind, Stage, WorkflowError};
pub use sync::SyncOutcome;
pub use target::resolve_target;

use stage::AtStage;

/// Everything a workflow reads and writes
pub trait FleetStore: RecordStore + CredentialStore {}

impl<T: RecordStore + CredentialStore> FleetStore for T {}

/// Default per-command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for every operation on managed config files
#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn FleetStore>,
    broker: ConnectionBroker,
    command_timeout: Duration,
    default_remote_path: String,
    backup_before_deploy: bool,
}

impl Workflow {
    pub fn new(store: Arc<dyn FleetStore>, broker: ConnectionBroker) -> Self {
        Self {
            store,
            broker,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            default_remote_path: DEFAULT_REMOTE_PATH.to_string(),
            backup_before_deploy: true,
        }
    }

    /// Wire the vault, broker timeouts and deploy defaults from settings
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn FleetStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SettingsError> {
        let broker = ConnectionBroker::new(settings.vault()?, transport)
            .with_connect_timeout(settings.connect_timeout());

        Ok(Self {
            store,
            broker,
            command_timeout: settings.command_timeout(),
            default_remote_path: settings.default_remote_path.clone(),
            backup_before_deploy: settings.backup_before_deploy,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn FleetStore> {
        &self.store
    }

    fn load_record(&self, id: u64) -> Result<ConfigRecord, WorkflowError> {
        self.store
            .get(id)
            .at(Stage::LoadRecord)?
            .ok_or(crate::ssh::ConfigurationError::NotFound {
                what: "config record",
                id,
            })
            .at(Stage::LoadRecord)
    }

    fn descriptor(&self, target: TargetRef) -> Result<ConnectionDescriptor, WorkflowError> {
        resolve_target(self.store.as_ref(), target).at(Stage::ResolveTarget)
    }

    async fn open(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<(Box<dyn RemoteSession>, AuthMethodUsed), WorkflowError> {
        self.broker.open(descriptor).await.at(Stage::OpenSession)
    }

    /// Run a command and judge its output
    async fn run(
        &self,
        session: &mut dyn RemoteSession,
        stage: Stage,
        command: &RemoteCommand,
    ) -> Result<ExecOutput, WorkflowError> {
        debug!("{}: running `{}`", stage, command.summary());

        let output = session
            .run(&command.line, self.command_timeout)
            .await
            .at(stage)?;

        if let Some(reason) = command.failure(&output) {
            return Err(WorkflowError::new(
                stage,
                FailureKind::Remote {
                    command: command.summary().to_string(),
                    reason,
                },
            ));
        }

        Ok(output)
    }
}

/// Close the session, then hand back the stage result
async fn finish<T>(
    mut session: Box<dyn RemoteSession>,
    result: Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    session.close().await;
    if let Err(e) = &result {
        info!("Session closed after failure at {}", e.stage);
    }
    result
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("broker", &self.broker)
            .field("command_timeout", &self.command_timeout)
            .field("default_remote_path", &self.default_remote_path)
            .field("backup_before_deploy", &self.backup_before_deploy)
            .finish_non_exhaustive()
    }
}
