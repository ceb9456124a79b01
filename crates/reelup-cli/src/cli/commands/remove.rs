//! `reelup remove <id>` – remove a job and its record, via the running
//! session if any.

use anyhow::Result;
use reelup_core::config::ReelupConfig;
use reelup_core::control::ControlCommand;

use crate::cli::control_socket;
use crate::cli::driver;

pub async fn run_remove(cfg: &ReelupConfig, id: i64) -> Result<()> {
    if let Ok(path) = reelup_core::control::default_control_socket_path() {
        if control_socket::send_command(&path, ControlCommand::Remove(id)).await? {
            println!("Sent remove for job {id} to the running session");
            return Ok(());
        }
    }

    let mut manager = driver::open_manager(cfg).await?;
    manager.require_job(id)?;
    manager.remove(id);
    manager.flush().await;
    println!("Removed job {id}");
    Ok(())
}
