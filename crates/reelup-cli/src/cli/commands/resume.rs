//! `reelup resume <id> <path>` – re-attach a file and drive the upload. If an
//! upload session is running, the request goes to it instead.

use anyhow::{Context, Result};
use reelup_core::config::ReelupConfig;
use reelup_core::control::ControlCommand;
use reelup_core::job::LocalFile;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cli::control_socket;
use crate::cli::driver;

pub async fn run_resume(cfg: &ReelupConfig, id: i64, path: &Path) -> Result<()> {
    if let Ok(socket_path) = reelup_core::control::default_control_socket_path() {
        let path = tokio::fs::canonicalize(path)
            .await
            .with_context(|| format!("resolve {}", path.display()))?;
        let cmd = ControlCommand::Resume { id, path };
        if control_socket::send_command(&socket_path, cmd).await? {
            println!("Sent resume for job {id} to the running session");
            return Ok(());
        }
    }

    let mut manager = driver::open_manager(cfg).await?;
    let job = manager.require_job(id)?;
    let file = LocalFile::open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;

    if !manager.resume(id, Arc::new(file)) {
        anyhow::bail!("job {} is {} and cannot be resumed", id, job.state);
    }
    println!("Resumed job {id} at {}%", job.progress_percent);

    let (tx, rx) = mpsc::channel(1);
    let socket_path = reelup_core::control::default_control_socket_path().ok();
    let listener = socket_path
        .as_ref()
        .map(|p| control_socket::spawn_control_listener(tx, p));

    driver::drive(manager, rx).await?;

    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(p) = socket_path {
        let _ = std::fs::remove_file(p);
    }
    Ok(())
}
