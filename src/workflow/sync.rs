//! Sync: remote file -> record
//!
//! `OpenSession -> ReadRemoteFile -> ParseNative -> Validate -> PersistRecord
//! -> CloseSession`. Simplifying the parsed tree cannot fail, so it has no
//! stage of its own. The record is written only after validation passes, so a
//! failed sync leaves it as it was.

use chrono::Utc;
use tracing::{info, warn};

use super::stage::{AtStage, Stage, WorkflowError};
use super::{finish, Workflow};
use crate::ssh::{AuthMethodUsed, RemoteCommand, RemoteSession};
use crate::state::ConfigRecord;
use crate::xrayr::{parse_native, simplify, validate, TransformError};

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Record as persisted
    pub record: ConfigRecord,
    pub method: AuthMethodUsed,
}

impl Workflow {
    /// Fetch the remote file of record `id` and store its simplified form
    pub async fn sync(&self, id: u64) -> Result<SyncOutcome, WorkflowError> {
        let record = self.load_record(id)?;
        let descriptor = self.descriptor(record.target)?;

        info!("Sync {} ({}) from {}", record.name, record.remote_path, descriptor.address());

        let (mut session, method) = self.open(&descriptor).await?;
        let result = self.sync_stages(session.as_mut(), record).await;
        let record = finish(session, result).await.inspect_err(|e| {
            warn!("Sync of record {} failed: {}", id, e);
        })?;

        info!("Sync of {} complete via {}", record.name, method);
        Ok(SyncOutcome { record, method })
    }

    async fn sync_stages(
        &self,
        session: &mut dyn RemoteSession,
        mut record: ConfigRecord,
    ) -> Result<ConfigRecord, WorkflowError> {
        let output = self
            .run(session, Stage::ReadRemoteFile, &RemoteCommand::read(&record.remote_path))
            .await?;
        let raw_text = String::from_utf8(output.stdout)
            .map_err(|e| TransformError::Parse(format!("remote file is not valid UTF-8: {}", e)))
            .at(Stage::ReadRemoteFile)?;

        let tree = parse_native(&raw_text).at(Stage::ParseNative)?;
        let simplified = simplify(&tree);
        validate(&simplified).at(Stage::Validate)?;

        let now = Utc::now();
        record.raw_text = Some(raw_text);
        record.simplified = Some(simplified);
        record.last_sync_at = Some(now);
        record.updated_at = now;

        self.store.put(record).at(Stage::PersistRecord)
    }
}
