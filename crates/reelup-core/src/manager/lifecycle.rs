//! Caller-driven transitions: enqueue, pause, resume, cancel, remove.

use std::sync::Arc;

use crate::config::PartRetention;
use crate::error::UploadError;
use crate::job::{Checkpoint, JobId, JobState, UploadJob, UploadSource};
use crate::session::{SessionRequest, UploadSession};
use crate::store::unix_timestamp;
use crate::transfer::UploadTarget;

use super::{EnqueueRequest, JobUpdate, UploadManager};

impl UploadManager {
    /// Obtains an upload session for `file` and queues a new job for it.
    ///
    /// If the session cannot be issued no job is created.
    pub async fn enqueue(
        &mut self,
        file: Arc<dyn UploadSource>,
        request: EnqueueRequest,
    ) -> Result<JobId, UploadError> {
        let session_request = SessionRequest {
            org: request.org,
            bucket: request.bucket,
            file_name: file.meta().name.clone(),
        };
        let issued = self.issuer.issue(&session_request).await.map_err(|e| {
            tracing::warn!(file = %session_request.file_name, "session issuance failed: {}", e);
            e
        })?;

        let id = self.next_id;
        self.next_id += 1;
        let job = UploadJob::new(UploadSession::bind(id, issued), file, unix_timestamp());
        tracing::info!(
            job_id = id,
            bucket = %job.bucket,
            key = %job.storage_key,
            size = job.file_meta.size,
            "job queued"
        );
        self.jobs.insert(id, job);
        self.commit(id);
        self.schedule();
        Ok(id)
    }

    /// Stops a queued or uploading job. Parts already sent stay on the
    /// backend and are reused on resume.
    pub fn pause(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if !matches!(job.state, JobState::Queued | JobState::Uploading) {
            return false;
        }
        if let Some(transfer) = job.transfer.take() {
            transfer.abort();
        }
        job.state = JobState::Paused;
        tracing::info!(job_id = id, progress = job.progress_percent, "job paused");
        self.commit(id);
        self.schedule();
        true
    }

    /// Re-attaches a file and puts the job back in the queue.
    ///
    /// Valid for paused and failed jobs, and for queued jobs restored without
    /// a file. A file whose size differs from the recorded one starts the
    /// upload over.
    pub fn resume(&mut self, id: JobId, file: Arc<dyn UploadSource>) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        let resumable = match job.state {
            JobState::Paused | JobState::Failed => true,
            JobState::Queued => job.file.is_none(),
            _ => false,
        };
        if !resumable {
            return false;
        }

        let meta = file.meta().clone();
        let mut stale = None;
        if meta.size != job.file_meta.size {
            tracing::info!(
                job_id = id,
                recorded = job.file_meta.size,
                supplied = meta.size,
                "file size changed; upload restarts from zero"
            );
            stale = job.checkpoint.take().map(|cp| (target_of(job), cp));
            job.progress_percent = 0;
            job.file_meta = meta;
        }
        job.file = Some(file);
        job.state = JobState::Queued;
        tracing::info!(job_id = id, progress = job.progress_percent, "job resumed");

        if let Some((target, checkpoint)) = stale {
            self.discard_parts(id, target, checkpoint);
        }
        self.commit(id);
        self.schedule();
        true
    }

    /// Cancels a job that has not completed. Cancelled is terminal.
    pub fn cancel(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if job.state.is_terminal() {
            return false;
        }
        if let Some(transfer) = job.transfer.take() {
            transfer.abort();
        }
        job.state = JobState::Cancelled;
        job.file = None;
        let stale = job.checkpoint.take().map(|cp| (target_of(job), cp));
        tracing::info!(job_id = id, "job cancelled");

        if let Some((target, checkpoint)) = stale {
            self.discard_parts(id, target, checkpoint);
        }
        self.commit(id);
        self.schedule();
        true
    }

    /// Drops a job from the registry and the store, whatever its state.
    pub fn remove(&mut self, id: JobId) -> bool {
        let Some(mut job) = self.jobs.remove(&id) else {
            return false;
        };
        if let Some(transfer) = job.transfer.take() {
            transfer.abort();
        }
        if let Some(checkpoint) = job.checkpoint.take() {
            self.discard_parts(id, target_of(&job), checkpoint);
        }
        tracing::info!(job_id = id, state = %job.state, "job removed");

        self.persist.delete(id);
        let _ = self.updates.send(JobUpdate::Removed(id));
        self.schedule();
        true
    }

    /// Stops every running transfer and leaves those jobs paused, without
    /// starting anything else, then waits for the store to catch up.
    pub async fn shutdown(mut self) {
        let running: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| j.state == JobState::Uploading)
            .map(|j| j.id)
            .collect();
        for id in &running {
            if let Some(job) = self.jobs.get_mut(id) {
                if let Some(transfer) = job.transfer.take() {
                    transfer.abort();
                }
                job.state = JobState::Paused;
            }
            self.commit(*id);
        }
        tracing::info!(paused = running.len(), "upload manager shutting down");
        self.flush().await;
    }

    /// Applies the part-retention policy to parts of a discarded upload.
    fn discard_parts(&self, id: JobId, target: UploadTarget, checkpoint: Checkpoint) {
        if self.part_retention == PartRetention::Retain {
            tracing::debug!(job_id = id, upload_id = %checkpoint.upload_id, "retaining uploaded parts");
            return;
        }
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.abort_upload(&target, &checkpoint.upload_id).await {
                Ok(()) => tracing::debug!(
                    job_id = id,
                    upload_id = %checkpoint.upload_id,
                    "aborted multipart upload"
                ),
                Err(e) => tracing::warn!(
                    job_id = id,
                    upload_id = %checkpoint.upload_id,
                    "abort of multipart upload failed: {}",
                    e
                ),
            }
        });
    }
}

/// Storage target of a job's object.
pub(super) fn target_of(job: &UploadJob) -> UploadTarget {
    UploadTarget {
        bucket: job.bucket.clone(),
        key: job.storage_key.clone(),
        content_type: job.file_meta.mime.clone(),
        credentials: job.credentials.clone(),
    }
}
