//! Upload job model: the live job, its durable record, and upload sources.

mod live;
mod record;
mod source;
mod types;

pub use live::UploadJob;
pub use record::PersistedJobRecord;
pub use source::{LocalFile, MemoryFile, UploadSource};
pub use types::*;
