//! Record registration and editing
//!
//! Store-only operations; nothing here opens a session, so they are plain
//! synchronous calls.

use chrono::Utc;
use tracing::info;

use super::stage::{AtStage, FailureKind, Stage, WorkflowError};
use super::Workflow;
use crate::state::{ConfigRecord, TargetRef};
use crate::xrayr::{default_template, validate, SimplifiedConfig};

impl Workflow {
    /// Create a record seeded with the default template
    ///
    /// The target must resolve to a usable descriptor; nothing connects.
    pub fn register(
        &self,
        name: &str,
        target: TargetRef,
        remote_path: Option<&str>,
    ) -> Result<ConfigRecord, WorkflowError> {
        let name = self.unique_name(name, None)?;

        self.descriptor(target)?
            .check()
            .at(Stage::ResolveTarget)?;

        let remote_path = remote_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_remote_path);

        let mut record = ConfigRecord::new(name, target, remote_path);
        record.simplified = Some(default_template());

        let record = self.store.put(record).at(Stage::PersistRecord)?;
        info!("Registered config record {} ({})", record.name, record.id);
        Ok(record)
    }

    /// Replace the stored simplified config; rejected configs are not stored
    pub fn update_simplified(
        &self,
        id: u64,
        config: SimplifiedConfig,
    ) -> Result<ConfigRecord, WorkflowError> {
        let mut record = self.load_record(id)?;
        validate(&config).at(Stage::Validate)?;

        record.simplified = Some(config);
        record.updated_at = Utc::now();
        self.store.put(record).at(Stage::PersistRecord)
    }

    pub fn rename(&self, id: u64, name: &str) -> Result<ConfigRecord, WorkflowError> {
        let mut record = self.load_record(id)?;
        record.name = self.unique_name(name, Some(id))?;
        record.updated_at = Utc::now();
        self.store.put(record).at(Stage::PersistRecord)
    }

    /// Delete record `id`, returning what was stored
    ///
    /// Remote files are left untouched.
    pub fn remove(&self, id: u64) -> Result<ConfigRecord, WorkflowError> {
        let record = self.load_record(id)?;
        self.store.delete(id).at(Stage::PersistRecord)?;
        info!("Removed config record {} ({})", record.name, record.id);
        Ok(record)
    }

    /// Trimmed `name`, unless empty or used by a record other than `owner`
    fn unique_name(&self, name: &str, owner: Option<u64>) -> Result<String, WorkflowError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::new(Stage::LoadRecord, FailureKind::EmptyName));
        }

        match self.store.find_by_name(name).at(Stage::LoadRecord)? {
            Some(existing) if Some(existing.id) != owner => Err(WorkflowError::new(
                Stage::LoadRecord,
                FailureKind::DuplicateName(name.to_string()),
            )),
            _ => Ok(name.to_string()),
        }
    }
}
