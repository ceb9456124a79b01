//! Queue scheduler.
//!
//! Decides which queued jobs start next under the global upload budget:
//! earliest-enqueued first, skipping queued jobs that have no file attached.

mod budget;
mod choose;

pub use budget::UploadBudget;
pub use choose::{plan_starts, uploading_count};
