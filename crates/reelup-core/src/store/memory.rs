//! In-memory job store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::job::{JobId, PersistedJobRecord};

use super::JobStore;

/// Job store held in process memory. Can be exported to and imported from
/// JSON, which is how embedding callers carry it across a reload.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: Mutex<BTreeMap<JobId, PersistedJobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: JobId) -> Option<PersistedJobRecord> {
        self.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Serializes every record, ordered by id.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<PersistedJobRecord> = self.lock().values().cloned().collect();
        Ok(serde_json::to_string(&records)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<PersistedJobRecord> = serde_json::from_str(json)?;
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Ok(Self {
            records: Mutex::new(map),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<JobId, PersistedJobRecord>> {
        // A poisoned map is still a consistent map: every write is a single insert/remove.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert(&self, record: &PersistedJobRecord) -> Result<()> {
        self.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedJobRecord>> {
        Ok(self.lock().values().cloned().collect())
    }

    async fn delete(&self, id: JobId) -> Result<()> {
        self.lock().remove(&id);
        Ok(())
    }
}
