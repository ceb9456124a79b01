//! Errors surfaced to callers of the upload manager.
//!
//! Transfer failures never reach the caller: they are absorbed into job state
//! (see `transfer::TransportError`). Persistence failures are logged and
//! broadcast (see `store::PersistenceError`).

use thiserror::Error;

use crate::job::JobId;

/// Failure to obtain an upload session for a file. The job is never created.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session endpoint not configured")]
    NotConfigured,
    #[error("session request failed: {0}")]
    Request(String),
    #[error("session endpoint returned HTTP {0}")]
    Http(u32),
    #[error("malformed session response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Error returned by the upload manager's fallible calls.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not issue upload session: {0}")]
    SessionIssuance(#[from] SessionError),
    #[error("no upload job with id {0}")]
    JobNotFound(JobId),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
