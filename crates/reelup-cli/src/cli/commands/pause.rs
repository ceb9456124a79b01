//! `reelup pause <id>` – pause a job. If an upload session is running,
//! the request goes to it over the control socket.

use anyhow::Result;
use reelup_core::config::ReelupConfig;
use reelup_core::control::ControlCommand;

use crate::cli::control_socket;
use crate::cli::driver;

pub async fn run_pause(cfg: &ReelupConfig, id: i64) -> Result<()> {
    if let Ok(path) = reelup_core::control::default_control_socket_path() {
        if control_socket::send_command(&path, ControlCommand::Pause(id)).await? {
            println!("Sent pause for job {id} to the running session");
            return Ok(());
        }
    }

    let mut manager = driver::open_manager(cfg).await?;
    let job = manager.require_job(id)?;
    if manager.pause(id) {
        manager.flush().await;
        println!("Paused job {id}");
    } else {
        println!("Job {id} is {}; nothing to pause", job.state);
    }
    Ok(())
}
