//! Deploy: record -> remote file
//!
//! `Validate -> OpenSession -> [BackupRemoteFile] -> SerializeNative ->
//! WriteRemoteFile -> VerifyRemoteFile -> CloseSession`. Expanding to the
//! native tree is infallible and happens inside `SerializeNative`. Validation runs
//! before any network call. When a backup is requested, nothing is written
//! unless the copy succeeded.

use chrono::Utc;
use tracing::{info, warn};

use super::stage::{AtStage, FailureKind, Stage, WorkflowError};
use super::{finish, Workflow};
use crate::ssh::{backup_path, AuthMethodUsed, RemoteCommand, RemoteSession, EXISTS_MARKER};
use crate::xrayr::{expand, serialize_native, validate, SimplifiedConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Copy the current remote file aside before overwriting it
    pub backup_original: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub method: AuthMethodUsed,
    pub remote_path: String,
    pub backup_path: Option<String>,
    /// Text written to the host
    pub content: String,
}

impl Workflow {
    /// Options taken from settings
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            backup_original: self.backup_before_deploy,
        }
    }

    /// Render record `id` and write it to its remote path
    ///
    /// The record itself is not modified.
    pub async fn deploy(
        &self,
        id: u64,
        options: DeployOptions,
    ) -> Result<DeployOutcome, WorkflowError> {
        let record = self.load_record(id)?;

        let simplified = record
            .simplified
            .as_ref()
            .ok_or(FailureKind::NothingToDeploy)
            .at(Stage::Validate)?;
        validate(simplified).at(Stage::Validate)?;

        let descriptor = self.descriptor(record.target)?;

        info!(
            "Deploy {} to {}:{} (backup: {})",
            record.name,
            descriptor.address(),
            record.remote_path,
            options.backup_original
        );

        let (mut session, method) = self.open(&descriptor).await?;
        let result = self
            .deploy_stages(session.as_mut(), &record.remote_path, simplified, options)
            .await;
        let (backup_path, content) = finish(session, result).await.inspect_err(|e| {
            warn!("Deploy of record {} failed: {}", id, e);
        })?;

        info!("Deploy of {} complete via {}", record.name, method);
        Ok(DeployOutcome {
            method,
            remote_path: record.remote_path,
            backup_path,
            content,
        })
    }

    async fn deploy_stages(
        &self,
        session: &mut dyn RemoteSession,
        path: &str,
        config: &SimplifiedConfig,
        options: DeployOptions,
    ) -> Result<(Option<String>, String), WorkflowError> {
        let backup = if options.backup_original {
            let target = backup_path(path, Utc::now());
            self.run(session, Stage::BackupRemoteFile, &RemoteCommand::backup(path, &target))
                .await?;
            info!("Backed up {} to {}", path, target);
            Some(target)
        } else {
            None
        };

        let tree = expand(config);
        let content = serialize_native(&tree).at(Stage::SerializeNative)?;

        self.run(session, Stage::WriteRemoteFile, &RemoteCommand::write(path, &content))
            .await?;

        let check = self
            .run(session, Stage::VerifyRemoteFile, &RemoteCommand::exists(path))
            .await?;
        if check.stdout_lossy().trim() != EXISTS_MARKER {
            return Err(WorkflowError::new(
                Stage::VerifyRemoteFile,
                FailureKind::VerificationFailed {
                    path: path.to_string(),
                },
            ));
        }

        Ok((backup, content))
    }
}
