//! `reelup cancel <id>` – cancel a job, via the running session if any.

use anyhow::Result;
use reelup_core::config::ReelupConfig;
use reelup_core::control::ControlCommand;

use crate::cli::control_socket;
use crate::cli::driver;

pub async fn run_cancel(cfg: &ReelupConfig, id: i64) -> Result<()> {
    if let Ok(path) = reelup_core::control::default_control_socket_path() {
        if control_socket::send_command(&path, ControlCommand::Cancel(id)).await? {
            println!("Sent cancel for job {id} to the running session");
            return Ok(());
        }
    }

    let mut manager = driver::open_manager(cfg).await?;
    let job = manager.require_job(id)?;
    if manager.cancel(id) {
        manager.flush().await;
        println!("Cancelled job {id}");
    } else {
        println!("Job {id} is {}; nothing to cancel", job.state);
    }
    Ok(())
}
