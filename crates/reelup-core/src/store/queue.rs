//! Asynchronous write queue in front of a `JobStore`.
//!
//! The manager never awaits a write. Ops are applied by a single writer task
//! in submission order, so writes for one job land in the order they were
//! made. Failures are logged and published on an error channel.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::job::{JobId, PersistedJobRecord};

use super::JobStore;

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// A store write that did not land.
#[derive(Debug, Clone, Error)]
#[error("{op} of job {job_id} failed: {message}")]
pub struct PersistenceError {
    pub op: &'static str,
    pub job_id: JobId,
    pub message: String,
}

enum PersistOp {
    Upsert(Box<PersistedJobRecord>),
    Delete(JobId),
    Flush(oneshot::Sender<()>),
}

/// Sending half of the write queue. Cheap to clone.
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
    errors: broadcast::Sender<PersistenceError>,
}

impl PersistQueue {
    /// Spawns the writer task. It exits once every `PersistQueue` clone is dropped
    /// and the queue is drained.
    pub fn spawn(store: Arc<dyn JobStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let handle = tokio::spawn(run_writer(rx, store, errors.clone()));
        (Self { tx, errors }, handle)
    }

    pub fn upsert(&self, record: PersistedJobRecord) {
        self.submit(PersistOp::Upsert(Box::new(record)));
    }

    pub fn delete(&self, id: JobId) {
        self.submit(PersistOp::Delete(id));
    }

    /// Resolves once every op submitted before this call has been applied.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.submit(PersistOp::Flush(ack_tx));
        let _ = ack_rx.await;
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<PersistenceError> {
        self.errors.subscribe()
    }

    fn submit(&self, op: PersistOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("job store writer stopped; dropping write");
        }
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<PersistOp>,
    store: Arc<dyn JobStore>,
    errors: broadcast::Sender<PersistenceError>,
) {
    while let Some(op) = rx.recv().await {
        let (op_name, job_id, result) = match op {
            PersistOp::Upsert(record) => ("upsert", record.id, store.upsert(&record).await),
            PersistOp::Delete(id) => ("delete", id, store.delete(id).await),
            PersistOp::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };
        if let Err(e) = result {
            tracing::warn!(job_id, op = op_name, "job store write failed: {:#}", e);
            let _ = errors.send(PersistenceError {
                op: op_name,
                job_id,
                message: format!("{:#}", e),
            });
        }
    }
}
