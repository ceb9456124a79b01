//! Durable job store.
//!
//! Keeps one `PersistedJobRecord` per job id so queued, paused, and failed
//! uploads survive a restart. Writes from the manager go through
//! `PersistQueue` and never block transfers.

mod memory;
mod queue;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::job::{JobId, PersistedJobRecord};

pub use memory::MemoryJobStore;
pub use queue::{PersistQueue, PersistenceError};
pub use sqlite::{SqliteJobStore, STORE_NAME, STORE_VERSION};

/// Key-value store of job records keyed by job id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the record for `record.id`.
    async fn upsert(&self, record: &PersistedJobRecord) -> Result<()>;

    /// All records, ordered by id (enqueue order).
    async fn load_all(&self) -> Result<Vec<PersistedJobRecord>>;

    /// Remove a record. Missing ids are not an error.
    async fn delete(&self, id: JobId) -> Result<()>;

    /// Highest id held by the store, counting records `load_all` could not
    /// decode. New ids must stay above it.
    async fn max_id(&self) -> Result<Option<JobId>> {
        Ok(self.load_all().await?.iter().map(|r| r.id).max())
    }
}

/// Current time as Unix seconds (record timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
