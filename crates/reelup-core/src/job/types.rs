//! Job identifiers, states, and the serializable pieces of a job.

use serde::{Deserialize, Serialize};

/// Job identifier. Allocated by the manager in enqueue order.
pub type JobId = i64;

/// Upload lifecycle state, stored as a string in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Uploading,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Uploading => "uploading",
            JobState::Paused => "paused",
            JobState::Cancelled => "cancelled",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => JobState::Queued,
            "uploading" => JobState::Uploading,
            "paused" => JobState::Paused,
            "cancelled" => JobState::Cancelled,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Failed,
        }
    }

    /// Cancelled and completed jobs never run again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Cancelled | JobState::Completed)
    }

    /// States shown in the "active" view.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Queued | JobState::Uploading | JobState::Paused
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable description of the file behind a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// A part the backend has acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartReceipt {
    pub part_number: i32,
    pub etag: String,
    pub size: u64,
}

/// Multipart upload id plus acknowledged parts, so a resumed job skips
/// parts already on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub upload_id: String,
    pub part_size: u64,
    #[serde(default)]
    pub parts: Vec<PartReceipt>,
}

impl Checkpoint {
    pub fn new(upload_id: String, part_size: u64) -> Self {
        Self {
            upload_id,
            part_size,
            parts: Vec::new(),
        }
    }

    /// Records a receipt, replacing any earlier receipt for the same part.
    pub fn record(&mut self, receipt: PartReceipt) {
        self.parts.retain(|p| p.part_number != receipt.part_number);
        self.parts.push(receipt);
        self.parts.sort_by_key(|p| p.part_number);
    }

    pub fn has_part(&self, part_number: i32) -> bool {
        self.parts.iter().any(|p| p.part_number == part_number)
    }

    pub fn bytes_acknowledged(&self) -> u64 {
        self.parts.iter().map(|p| p.size).sum()
    }
}

/// Read-only view of a job for UIs and observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub bucket: String,
    pub storage_key: String,
    pub state: JobState,
    pub progress_percent: u8,
    pub file_meta: FileMeta,
    /// True while a live file handle is attached.
    pub has_file: bool,
    pub updated_at: i64,
}
