//! Workflow stages and the errors they report

use thiserror::Error;

use crate::ssh::{BrokerError, ConfigurationError, SshError};
use crate::state::StoreError;
use crate::xrayr::{TransformError, ValidationError};

/// Step of a sync, deploy, probe or registry operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    LoadRecord,
    ResolveTarget,
    OpenSession,
    ReadRemoteFile,
    ParseNative,
    Validate,
    PersistRecord,
    BackupRemoteFile,
    SerializeNative,
    WriteRemoteFile,
    VerifyRemoteFile,
    RunCommand,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::LoadRecord => "load_record",
            Stage::ResolveTarget => "resolve_target",
            Stage::OpenSession => "open_session",
            Stage::ReadRemoteFile => "read_remote_file",
            Stage::ParseNative => "parse_native",
            Stage::Validate => "validate",
            Stage::PersistRecord => "persist_record",
            Stage::BackupRemoteFile => "backup_remote_file",
            Stage::SerializeNative => "serialize_native",
            Stage::WriteRemoteFile => "write_remote_file",
            Stage::VerifyRemoteFile => "verify_remote_file",
            Stage::RunCommand => "run_command",
        };
        f.write_str(name)
    }
}

/// Underlying failure of a stage
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The session itself failed (channel error, timeout, disconnect)
    #[error(transparent)]
    Transport(#[from] SshError),

    /// The command ran and reported failure
    #[error("remote command `{command}` failed: {reason}")]
    Remote { command: String, reason: String },

    #[error("{path} not present after write")]
    VerificationFailed { path: String },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("record has no simplified configuration to deploy")]
    NothingToDeploy,

    #[error("a record named {0:?} already exists")]
    DuplicateName(String),

    #[error("record name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error taxonomy the caller branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Decryption,
    Parse,
    Validation,
    Serialization,
    Remote,
    Storage,
}

/// A stage failed; nothing after it ran
#[derive(Debug, Error)]
#[error("{stage} failed: {kind}")]
pub struct WorkflowError {
    pub stage: Stage,
    pub kind: FailureKind,
}

impl WorkflowError {
    pub fn new(stage: Stage, kind: impl Into<FailureKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.kind {
            FailureKind::Configuration(_)
            | FailureKind::DuplicateName(_)
            | FailureKind::EmptyName => ErrorCategory::Configuration,
            FailureKind::Broker(BrokerError::Configuration(_)) => ErrorCategory::Configuration,
            FailureKind::Broker(BrokerError::Connection { .. }) => ErrorCategory::Connection,
            FailureKind::Broker(BrokerError::Decryption(_)) => ErrorCategory::Decryption,
            FailureKind::Transport(_)
            | FailureKind::Remote { .. }
            | FailureKind::VerificationFailed { .. } => ErrorCategory::Remote,
            FailureKind::Transform(TransformError::Parse(_)) => ErrorCategory::Parse,
            FailureKind::Transform(TransformError::Serialization(_)) => {
                ErrorCategory::Serialization
            }
            FailureKind::Validation(_) | FailureKind::NothingToDeploy => ErrorCategory::Validation,
            FailureKind::Store(_) => ErrorCategory::Storage,
        }
    }

    /// Connection failures and remote timeouts; everything else needs a fix first
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            FailureKind::Broker(e) => e.is_retryable(),
            FailureKind::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Attach a stage to a fallible step
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, WorkflowError>;
}

impl<T, E: Into<FailureKind>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, WorkflowError> {
        self.map_err(|e| WorkflowError::new(stage, e))
    }
}
