//! Shared helpers for the upload manager integration tests.

#![allow(dead_code)]

pub mod issuer;
pub mod scripted_transport;

use std::sync::Arc;
use std::time::Duration;

use reelup_core::config::ReelupConfig;
use reelup_core::job::{MemoryFile, UploadSource};
use reelup_core::status::NoopStatusReporter;
use reelup_core::store::JobStore;
use reelup_core::{Collaborators, EnqueueRequest, UploadManager};

use issuer::RecordingIssuer;
use scripted_transport::ScriptedTransport;

/// Config with small parts, one part in flight per job.
pub fn test_config(max_concurrent_uploads: usize, part_size_bytes: u64) -> ReelupConfig {
    ReelupConfig {
        max_concurrent_uploads,
        part_size_bytes,
        part_concurrency: 1,
        ..ReelupConfig::default()
    }
}

pub fn collaborators(
    store: Arc<dyn JobStore>,
    issuer: Arc<RecordingIssuer>,
    transport: Arc<ScriptedTransport>,
) -> Collaborators {
    Collaborators {
        store,
        issuer,
        transport,
        status: Arc::new(NoopStatusReporter),
    }
}

pub fn request() -> EnqueueRequest {
    EnqueueRequest {
        org: "acme".to_string(),
        bucket: "media".to_string(),
    }
}

pub fn media_file(name: &str, len: usize) -> Arc<dyn UploadSource> {
    let data: Vec<u8> = (0u8..=250).cycle().take(len).collect();
    Arc::new(MemoryFile::new(name, "video/mp4", data))
}

/// Storage key the recording issuer hands out for `name`.
pub fn key_for(name: &str) -> String {
    format!("acme/raw/{}", name)
}

/// Processes transfer events until `done` holds. Panics after five seconds.
pub async fn drive_until(manager: &mut UploadManager, mut done: impl FnMut(&UploadManager) -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !done(manager) {
            if !manager.process_next_event().await {
                tokio::task::yield_now().await;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached while driving the manager");
}

/// Waits for a spawned side effect to show up. Panics after five seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "side effect not observed");
}
