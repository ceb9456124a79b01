//! The in-memory job owned by the manager's registry.

use std::sync::Arc;

use crate::session::{TemporaryCredentials, UploadSession};
use crate::transfer::TransferHandle;

use super::record::PersistedJobRecord;
use super::source::UploadSource;
use super::types::{Checkpoint, FileMeta, JobId, JobSnapshot, JobState};

/// One file's upload lifecycle.
///
/// `file` is exclusively held by the job while attached and is `None` after
/// a restore. `transfer` exists exactly while `state == Uploading`.
#[derive(Debug)]
pub struct UploadJob {
    pub id: JobId,
    pub bucket: String,
    pub storage_key: String,
    pub credentials: TemporaryCredentials,
    pub file: Option<Arc<dyn UploadSource>>,
    pub file_meta: FileMeta,
    pub state: JobState,
    pub progress_percent: u8,
    pub checkpoint: Option<Checkpoint>,
    pub created_at: i64,
    pub updated_at: i64,
    pub(crate) transfer: Option<TransferHandle>,
}

impl UploadJob {
    /// Builds a queued job from an issued session and the file it was issued for.
    pub fn new(session: UploadSession, file: Arc<dyn UploadSource>, now: i64) -> Self {
        let file_meta = file.meta().clone();
        Self {
            id: session.job_id,
            bucket: session.bucket,
            storage_key: session.storage_key,
            credentials: session.credentials,
            file: Some(file),
            file_meta,
            state: JobState::Queued,
            progress_percent: 0,
            checkpoint: None,
            created_at: now,
            updated_at: now,
            transfer: None,
        }
    }

    /// Rebuilds a job from its durable record.
    ///
    /// Neither the file handle nor the transfer survive a restart, so a job
    /// that was uploading comes back paused and waits for the caller to
    /// re-supply the file.
    pub fn restore(record: PersistedJobRecord) -> Self {
        let state = match record.state {
            JobState::Uploading => JobState::Paused,
            other => other,
        };
        Self {
            id: record.id,
            bucket: record.bucket,
            storage_key: record.storage_key,
            credentials: record.credentials,
            file: None,
            file_meta: record.file_meta,
            state,
            progress_percent: record.progress.min(100),
            checkpoint: record.checkpoint,
            created_at: record.created_at,
            updated_at: record.updated_at,
            transfer: None,
        }
    }

    pub fn to_record(&self) -> PersistedJobRecord {
        PersistedJobRecord {
            id: self.id,
            bucket: self.bucket.clone(),
            storage_key: self.storage_key.clone(),
            state: self.state,
            progress: self.progress_percent,
            credentials: self.credentials.clone(),
            file_meta: self.file_meta.clone(),
            checkpoint: self.checkpoint.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            bucket: self.bucket.clone(),
            storage_key: self.storage_key.clone(),
            state: self.state,
            progress_percent: self.progress_percent,
            file_meta: self.file_meta.clone(),
            has_file: self.file.is_some(),
            updated_at: self.updated_at,
        }
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Eligible for the next scheduling pass.
    pub fn is_runnable(&self) -> bool {
        self.state == JobState::Queued && self.file.is_some()
    }

    /// Current transfer generation, if uploading.
    pub(crate) fn transfer_id(&self) -> Option<u64> {
        self.transfer.as_ref().map(|t| t.transfer_id())
    }
}
