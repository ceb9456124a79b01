//! In-memory multipart backend with per-key gates.
//!
//! When gated, every `upload_part` for a key waits for a permit released by
//! the test, which makes part-by-part progress deterministic.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use reelup_core::job::PartReceipt;
use reelup_core::transfer::{MultipartTransport, TransportError, UploadTarget};

const OPEN_GATE_PERMITS: usize = 1 << 20;

#[derive(Debug, Default)]
struct Upload {
    key: String,
    parts: BTreeMap<i32, usize>,
}

#[derive(Default)]
struct Backend {
    next_upload: u64,
    uploads: HashMap<String, Upload>,
    created: Vec<String>,
    part_calls: Vec<(String, i32)>,
    completed: Vec<(String, Vec<i32>)>,
    aborted: Vec<String>,
    fail_next_part: HashSet<String>,
}

pub struct ScriptedTransport {
    gated: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    backend: Mutex<Backend>,
}

impl ScriptedTransport {
    /// Parts go through immediately.
    pub fn open() -> Self {
        Self {
            gated: AtomicBool::new(false),
            gates: Mutex::new(HashMap::new()),
            backend: Mutex::new(Backend::default()),
        }
    }

    /// Every part waits for `release`.
    pub fn gated() -> Self {
        let transport = Self::open();
        transport.gated.store(true, Ordering::SeqCst);
        transport
    }

    /// Lets `parts` more parts of `key` through.
    pub fn release(&self, key: &str, parts: usize) {
        self.gate(key).add_permits(parts);
    }

    /// Opens every gate, now and for keys seen later.
    pub fn release_all(&self) {
        self.gated.store(false, Ordering::SeqCst);
        for gate in self.gates.lock().unwrap().values() {
            gate.add_permits(OPEN_GATE_PERMITS);
        }
    }

    /// The next part upload for `key` fails with a network error.
    pub fn fail_next_part(&self, key: &str) {
        self.backend
            .lock()
            .unwrap()
            .fail_next_part
            .insert(key.to_string());
    }

    /// Forgets every open upload, as if the backend expired them.
    pub fn expire_uploads(&self) {
        self.backend.lock().unwrap().uploads.clear();
    }

    pub fn created_for(&self, key: &str) -> usize {
        self.backend
            .lock()
            .unwrap()
            .created
            .iter()
            .filter(|k| *k == key)
            .count()
    }

    /// Part numbers uploaded for `key`, in call order.
    pub fn part_calls_for(&self, key: &str) -> Vec<i32> {
        self.backend
            .lock()
            .unwrap()
            .part_calls
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, n)| *n)
            .collect()
    }

    /// Part lists of completed uploads for `key`.
    pub fn completed_for(&self, key: &str) -> Vec<Vec<i32>> {
        self.backend
            .lock()
            .unwrap()
            .completed
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, parts)| parts.clone())
            .collect()
    }

    pub fn aborted_for(&self, key: &str) -> usize {
        self.backend
            .lock()
            .unwrap()
            .aborted
            .iter()
            .filter(|k| *k == key)
            .count()
    }

    fn gate(&self, key: &str) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(
            gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(0))),
        )
    }
}

#[async_trait]
impl MultipartTransport for ScriptedTransport {
    async fn create_upload(&self, target: &UploadTarget) -> Result<String, TransportError> {
        let mut backend = self.backend.lock().unwrap();
        backend.next_upload += 1;
        let upload_id = format!("upload-{}", backend.next_upload);
        backend.uploads.insert(
            upload_id.clone(),
            Upload {
                key: target.key.clone(),
                parts: BTreeMap::new(),
            },
        );
        backend.created.push(target.key.clone());
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, TransportError> {
        if self.gated.load(Ordering::SeqCst) {
            let gate = self.gate(&target.key);
            gate.acquire()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?
                .forget();
        }

        let mut backend = self.backend.lock().unwrap();
        if backend.fail_next_part.remove(&target.key) {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        let upload = backend
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| TransportError::UploadNotFound(upload_id.to_string()))?;
        assert_eq!(upload.key, target.key, "part sent to another key's upload");
        upload.parts.insert(part_number, body.len());
        backend.part_calls.push((target.key.clone(), part_number));
        Ok(format!("\"{}-{}\"", upload_id, part_number))
    }

    async fn complete_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<(), TransportError> {
        let mut backend = self.backend.lock().unwrap();
        let upload = backend
            .uploads
            .remove(upload_id)
            .ok_or_else(|| TransportError::UploadNotFound(upload_id.to_string()))?;
        let numbers: Vec<i32> = parts.iter().map(|p| p.part_number).collect();
        let stored: Vec<i32> = upload.parts.keys().copied().collect();
        if numbers != stored {
            return Err(TransportError::Rejected(format!(
                "part list {:?} does not match stored parts {:?}",
                numbers, stored
            )));
        }
        backend.completed.push((target.key.clone(), numbers));
        Ok(())
    }

    async fn abort_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), TransportError> {
        let mut backend = self.backend.lock().unwrap();
        backend.uploads.remove(upload_id);
        backend.aborted.push(target.key.clone());
        Ok(())
    }
}
