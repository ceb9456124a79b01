pub mod config;
pub mod logging;

pub mod control;
mod curl_json;
pub mod error;
pub mod job;
pub mod manager;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod store;
pub mod transfer;

pub use manager::{Collaborators, EnqueueRequest, JobUpdate, UploadManager};
