//! Runs one job's multipart transfer as a spawned task.
//!
//! The task reports back only through `TransferEvent`s; it never touches the
//! registry. Aborting the task drops its part `JoinSet`, which cancels the
//! in-flight part requests.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::job::{Checkpoint, JobId, PartReceipt, UploadSource};

use super::plan::{plan_parts, PartSpec};
use super::transport::{MultipartTransport, TransportError, UploadTarget};

/// Everything a transfer task needs, captured at start.
#[derive(Debug)]
pub struct TransferRequest {
    pub job_id: JobId,
    pub transfer_id: u64,
    pub target: UploadTarget,
    pub source: Arc<dyn UploadSource>,
    pub part_size: u64,
    pub part_concurrency: usize,
    /// Parts already on the backend from an earlier transfer of this job.
    pub checkpoint: Option<Checkpoint>,
}

#[derive(Debug)]
pub enum TransferEventKind {
    /// A new multipart upload was opened with parts of `part_size` bytes.
    Started { upload_id: String, part_size: u64 },
    PartDone(PartReceipt),
    Completed,
    Failed(TransportError),
}

/// Message from a transfer task to the manager, tagged with the transfer
/// generation so events from an aborted transfer can be told apart.
#[derive(Debug)]
pub struct TransferEvent {
    pub job_id: JobId,
    pub transfer_id: u64,
    pub kind: TransferEventKind,
}

/// The live transfer of an uploading job. Dropping it aborts the task.
#[derive(Debug)]
pub struct TransferHandle {
    transfer_id: u64,
    task: JoinHandle<()>,
}

impl TransferHandle {
    pub fn transfer_id(&self) -> u64 {
        self.transfer_id
    }

    /// Best-effort abort; parts already sent stay on the backend.
    pub fn abort(self) {
        drop(self);
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns the transfer task and returns its handle.
pub fn spawn_transfer(
    transport: Arc<dyn MultipartTransport>,
    request: TransferRequest,
    events: mpsc::Sender<TransferEvent>,
) -> TransferHandle {
    let transfer_id = request.transfer_id;
    let task = tokio::spawn(async move {
        let kind = match run_transfer(transport, &request, &events).await {
            Ok(()) => TransferEventKind::Completed,
            Err(e) => TransferEventKind::Failed(e),
        };
        emit(&events, &request, kind).await;
    });
    TransferHandle { transfer_id, task }
}

async fn run_transfer(
    transport: Arc<dyn MultipartTransport>,
    request: &TransferRequest,
    events: &mpsc::Sender<TransferEvent>,
) -> Result<(), TransportError> {
    let total = request.source.meta().size;
    let (upload_id, mut receipts) = match &request.checkpoint {
        Some(cp) => {
            tracing::debug!(
                job_id = request.job_id,
                upload_id = %cp.upload_id,
                parts = cp.parts.len(),
                "reusing multipart upload"
            );
            (cp.upload_id.clone(), cp.parts.clone())
        }
        None => {
            let upload_id = transport.create_upload(&request.target).await?;
            emit(
                events,
                request,
                TransferEventKind::Started {
                    upload_id: upload_id.clone(),
                    part_size: request.part_size,
                },
            )
            .await;
            (upload_id, Vec::new())
        }
    };

    let mut pending: VecDeque<PartSpec> = plan_parts(total, request.part_size)
        .into_iter()
        .filter(|p| {
            !request
                .checkpoint
                .as_ref()
                .is_some_and(|cp| cp.has_part(p.number))
        })
        .collect();

    let max_in_flight = request.part_concurrency.max(1);
    let mut join_set = JoinSet::new();
    loop {
        while join_set.len() < max_in_flight {
            let Some(part) = pending.pop_front() else {
                break;
            };
            let transport = Arc::clone(&transport);
            let source = Arc::clone(&request.source);
            let target = request.target.clone();
            let upload_id = upload_id.clone();
            join_set.spawn(async move {
                upload_one_part(transport.as_ref(), source.as_ref(), &target, &upload_id, part)
                    .await
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let receipt =
            res.map_err(|e| TransportError::Network(format!("part task join: {}", e)))??;
        emit(events, request, TransferEventKind::PartDone(receipt.clone())).await;
        receipts.push(receipt);
    }

    receipts.sort_by_key(|r| r.part_number);
    receipts.dedup_by_key(|r| r.part_number);
    transport
        .complete_upload(&request.target, &upload_id, &receipts)
        .await?;
    tracing::debug!(job_id = request.job_id, parts = receipts.len(), "multipart upload completed");
    Ok(())
}

async fn emit(
    events: &mpsc::Sender<TransferEvent>,
    request: &TransferRequest,
    kind: TransferEventKind,
) {
    // A closed channel means the manager is gone; nothing left to report to.
    let _ = events
        .send(TransferEvent {
            job_id: request.job_id,
            transfer_id: request.transfer_id,
            kind,
        })
        .await;
}

async fn upload_one_part(
    transport: &dyn MultipartTransport,
    source: &dyn UploadSource,
    target: &UploadTarget,
    upload_id: &str,
    part: PartSpec,
) -> Result<PartReceipt, TransportError> {
    let body = source.read_part(part.offset, part.len).await?;
    let etag = transport
        .upload_part(target, upload_id, part.number, body)
        .await?;
    Ok(PartReceipt {
        part_number: part.number,
        etag,
        size: part.len,
    })
}
