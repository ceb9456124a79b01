//! Scheduling passes, transfer start, and transfer event handling.

use std::sync::Arc;

use crate::job::{Checkpoint, JobId, JobState};
use crate::scheduler;
use crate::status::{StatusUpdate, STATUS_UPLOADING};
use crate::transfer::{
    progress_percent, spawn_transfer, TransferEvent, TransferEventKind, TransferRequest,
    TransportError,
};

use super::lifecycle::target_of;
use super::UploadManager;

impl UploadManager {
    /// Applies the next transfer event, waiting for one if any job is
    /// uploading.
    ///
    /// Returns `false` when nothing is uploading and no event is pending.
    /// Nothing is awaited after the receive, so dropping this future inside
    /// `tokio::select!` never loses an event.
    pub async fn process_next_event(&mut self) -> bool {
        let event = if self.uploading_count() > 0 {
            match self.events_rx.recv().await {
                Some(event) => event,
                None => return false,
            }
        } else {
            match self.events_rx.try_recv() {
                Ok(event) => event,
                Err(_) => return false,
            }
        };
        self.apply_event(event);
        true
    }

    /// Drives transfers until no job is uploading.
    pub async fn run_until_idle(&mut self) {
        while self.process_next_event().await {}
    }

    /// Starts queued jobs while the budget has free slots.
    pub(super) fn schedule(&mut self) {
        for id in scheduler::plan_starts(self.jobs.values(), self.budget) {
            self.start_transfer(id);
        }
    }

    fn start_transfer(&mut self, id: JobId) {
        let transfer_id = self.next_transfer_id;
        self.next_transfer_id += 1;

        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        let Some(source) = job.file.clone() else {
            return;
        };
        // A checkpoint fixes the part layout of its upload.
        let part_size = job
            .checkpoint
            .as_ref()
            .map_or(self.part_size, |cp| cp.part_size);
        let resumed_parts = job.checkpoint.as_ref().map_or(0, |cp| cp.parts.len());
        let request = TransferRequest {
            job_id: id,
            transfer_id,
            target: target_of(job),
            source,
            part_size,
            part_concurrency: self.part_concurrency,
            checkpoint: job.checkpoint.clone(),
        };
        job.transfer = Some(spawn_transfer(
            Arc::clone(&self.transport),
            request,
            self.events_tx.clone(),
        ));
        job.state = JobState::Uploading;

        let update = StatusUpdate {
            storage_path: job.storage_key.clone(),
            size: job.file_meta.size,
            mime_type: job.file_meta.mime.clone(),
            status: STATUS_UPLOADING.to_string(),
        };
        let status = Arc::clone(&self.status);
        tokio::spawn(async move {
            if let Err(e) = status.transfer_started(&update).await {
                tracing::warn!(job_id = id, "status update failed: {:#}", e);
            }
        });

        tracing::info!(job_id = id, transfer_id, resumed_parts, "upload started");
        self.commit(id);
    }

    pub(super) fn apply_event(&mut self, event: TransferEvent) {
        let Some(job) = self.jobs.get_mut(&event.job_id) else {
            tracing::debug!(job_id = event.job_id, "event for unknown job ignored");
            return;
        };
        if job.state != JobState::Uploading || job.transfer_id() != Some(event.transfer_id) {
            tracing::debug!(
                job_id = event.job_id,
                transfer_id = event.transfer_id,
                "stale transfer event ignored"
            );
            return;
        }

        let id = event.job_id;
        match event.kind {
            TransferEventKind::Started {
                upload_id,
                part_size,
            } => {
                tracing::debug!(job_id = id, %upload_id, "multipart upload opened");
                job.checkpoint = Some(Checkpoint::new(upload_id, part_size));
                self.commit(id);
            }
            TransferEventKind::PartDone(receipt) => {
                let Some(checkpoint) = job.checkpoint.as_mut() else {
                    tracing::debug!(job_id = id, "part receipt without checkpoint ignored");
                    return;
                };
                let part_number = receipt.part_number;
                checkpoint.record(receipt);
                job.progress_percent =
                    progress_percent(checkpoint.bytes_acknowledged(), job.file_meta.size);
                tracing::debug!(job_id = id, part_number, progress = job.progress_percent, "part uploaded");
                self.commit(id);
            }
            TransferEventKind::Completed => {
                job.state = JobState::Completed;
                job.progress_percent = 100;
                job.transfer = None;
                job.checkpoint = None;
                job.file = None;
                tracing::info!(job_id = id, key = %job.storage_key, "upload completed");
                self.commit(id);
                self.schedule();
            }
            TransferEventKind::Failed(err) => {
                job.state = JobState::Failed;
                job.transfer = None;
                if matches!(err, TransportError::UploadNotFound(_)) {
                    job.checkpoint = None;
                    job.progress_percent = 0;
                }
                tracing::warn!(job_id = id, progress = job.progress_percent, "upload failed: {}", err);
                self.commit(id);
                self.schedule();
            }
        }
    }
}
