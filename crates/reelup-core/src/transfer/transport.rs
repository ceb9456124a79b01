//! Object-store multipart transport interface.

use async_trait::async_trait;
use thiserror::Error;

use crate::job::PartReceipt;
use crate::session::TemporaryCredentials;

/// Where one job's object goes, and the credentials allowed to put it there.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub credentials: TemporaryCredentials,
}

/// Transfer failure. Absorbed into job state; never propagated to callers.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The multipart upload id is unknown to the backend (expired or aborted).
    #[error("multipart upload {0} no longer exists")]
    UploadNotFound(String),
    #[error("storage request failed: {0}")]
    Network(String),
    #[error("storage rejected request: {0}")]
    Rejected(String),
    #[error("reading upload source: {0}")]
    Source(#[from] std::io::Error),
}

/// Multipart upload protocol. Per-part retries, if any, belong to the
/// implementation; the manager never retries.
#[async_trait]
pub trait MultipartTransport: Send + Sync {
    /// Opens a multipart upload and returns its upload id.
    async fn create_upload(&self, target: &UploadTarget) -> Result<String, TransportError>;

    /// Uploads one part and returns its ETag.
    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, TransportError>;

    /// Assembles the object from `parts` (sorted by part number).
    async fn complete_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<(), TransportError>;

    /// Discards the upload and any parts already stored.
    async fn abort_upload(&self, target: &UploadTarget, upload_id: &str)
        -> Result<(), TransportError>;
}
