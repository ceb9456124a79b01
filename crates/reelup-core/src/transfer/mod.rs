//! Transfer executor: one job's multipart upload.
//!
//! Each uploading job has exactly one spawned transfer task. Parts run in a
//! bounded `JoinSet`; progress, completion, and failure come back to the
//! manager as `TransferEvent`s.

mod executor;
mod plan;
mod s3;
mod transport;

pub use executor::{
    spawn_transfer, TransferEvent, TransferEventKind, TransferHandle, TransferRequest,
};
pub use plan::{plan_parts, progress_percent, PartSpec};
pub use s3::S3Transport;
pub use transport::{MultipartTransport, TransportError, UploadTarget};
