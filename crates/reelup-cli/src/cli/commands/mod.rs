//! CLI command handlers, one file per command.

mod cancel;
mod completions;
mod pause;
mod remove;
mod resume;
mod status;
mod upload;

pub use cancel::run_cancel;
pub use completions::run_completions;
pub use pause::run_pause;
pub use remove::run_remove;
pub use resume::run_resume;
pub use status::run_status;
pub use upload::run_upload;
