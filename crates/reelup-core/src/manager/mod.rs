//! Upload manager: the registry of jobs and the public lifecycle API.
//!
//! The manager is owned by one task and mutated through `&mut self`. Transfer
//! tasks report back over an event channel which the owner drains with
//! `process_next_event`. Every mutation is persisted through the write queue
//! and published to subscribers.

mod events;
mod lifecycle;

use anyhow::Context;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::config::{PartRetention, ReelupConfig};
use crate::error::UploadError;
use crate::job::{JobId, JobSnapshot, JobState, UploadJob};
use crate::scheduler::{self, UploadBudget};
use crate::session::SessionIssuer;
use crate::status::StatusReporter;
use crate::store::{unix_timestamp, JobStore, PersistQueue, PersistenceError};
use crate::transfer::{MultipartTransport, TransferEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// External services the manager talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn JobStore>,
    pub issuer: Arc<dyn SessionIssuer>,
    pub transport: Arc<dyn MultipartTransport>,
    pub status: Arc<dyn StatusReporter>,
}

/// Where a newly enqueued file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueRequest {
    pub org: String,
    pub bucket: String,
}

/// Change notification published on every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Changed(JobSnapshot),
    Removed(JobId),
}

pub struct UploadManager {
    jobs: BTreeMap<JobId, UploadJob>,
    next_id: JobId,
    next_transfer_id: u64,
    budget: UploadBudget,
    part_size: u64,
    part_concurrency: usize,
    part_retention: PartRetention,
    issuer: Arc<dyn SessionIssuer>,
    transport: Arc<dyn MultipartTransport>,
    status: Arc<dyn StatusReporter>,
    persist: PersistQueue,
    events_tx: mpsc::Sender<TransferEvent>,
    events_rx: mpsc::Receiver<TransferEvent>,
    updates: broadcast::Sender<JobUpdate>,
}

impl UploadManager {
    /// Loads every persisted job and builds the registry.
    ///
    /// Jobs that were uploading when the process stopped come back paused
    /// without a file, and the demoted record is written back. Nothing is
    /// started: restored jobs need a file from `resume` first.
    pub async fn open(cfg: &ReelupConfig, collaborators: Collaborators) -> Result<Self, UploadError> {
        let records = collaborators
            .store
            .load_all()
            .await
            .context("load persisted upload jobs")?;
        let highest_stored = collaborators
            .store
            .max_id()
            .await
            .context("read highest upload job id")?;
        let (persist, _writer) = PersistQueue::spawn(Arc::clone(&collaborators.store));

        let mut jobs = BTreeMap::new();
        let mut demoted = 0usize;
        for record in records {
            let was_uploading = record.state == JobState::Uploading;
            let mut job = UploadJob::restore(record);
            if was_uploading {
                job.updated_at = unix_timestamp();
                persist.upsert(job.to_record());
                demoted += 1;
            }
            jobs.insert(job.id, job);
        }
        // Unreadable rows keep their ids; never hand one out again.
        let next_id = jobs
            .keys()
            .next_back()
            .copied()
            .max(highest_stored)
            .map_or(1, |id| id + 1);
        tracing::info!(jobs = jobs.len(), demoted, "upload manager opened");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Ok(Self {
            jobs,
            next_id,
            next_transfer_id: 1,
            budget: UploadBudget::new(cfg.effective_max_concurrent()),
            part_size: cfg.effective_part_size(),
            part_concurrency: cfg.effective_part_concurrency(),
            part_retention: cfg.part_retention,
            issuer: collaborators.issuer,
            transport: collaborators.transport,
            status: collaborators.status,
            persist,
            events_tx,
            events_rx,
            updates,
        })
    }

    /// All jobs in enqueue order.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.jobs.values().map(UploadJob::snapshot).collect()
    }

    /// Queued, uploading, and paused jobs.
    pub fn active_jobs(&self) -> Vec<JobSnapshot> {
        self.filtered(|state| state.is_active())
    }

    pub fn completed_jobs(&self) -> Vec<JobSnapshot> {
        self.filtered(|state| state == JobState::Completed)
    }

    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.get(&id).map(UploadJob::snapshot)
    }

    /// Like `job`, for callers that treat an unknown id as an error.
    pub fn require_job(&self, id: JobId) -> Result<JobSnapshot, UploadError> {
        self.job(id).ok_or(UploadError::JobNotFound(id))
    }

    pub fn uploading_count(&self) -> usize {
        scheduler::uploading_count(self.jobs.values())
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.budget.max_concurrent()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    pub fn persistence_errors(&self) -> broadcast::Receiver<PersistenceError> {
        self.persist.subscribe_errors()
    }

    /// Waits until every write issued so far has reached the store.
    pub async fn flush(&self) {
        self.persist.flush().await;
    }

    fn filtered(&self, keep: impl Fn(JobState) -> bool) -> Vec<JobSnapshot> {
        self.jobs
            .values()
            .filter(|j| keep(j.state))
            .map(UploadJob::snapshot)
            .collect()
    }

    /// Stamps, persists, and publishes the current state of `id`.
    fn commit(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.updated_at = unix_timestamp();
            self.persist.upsert(job.to_record());
            // No subscribers is fine.
            let _ = self.updates.send(JobUpdate::Changed(job.snapshot()));
        }
    }
}
