//! `reelup upload <paths>...` – queue files and drive the uploads.

use anyhow::{Context, Result};
use reelup_core::config::ReelupConfig;
use reelup_core::job::LocalFile;
use reelup_core::EnqueueRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cli::control_socket;
use crate::cli::driver::{self, DriveOutcome};

const CONTROL_QUEUE: usize = 16;

pub async fn run_upload(
    cfg: &ReelupConfig,
    paths: &[PathBuf],
    bucket: Option<String>,
    org: Option<String>,
) -> Result<()> {
    let bucket = bucket
        .or_else(|| cfg.session.bucket.clone())
        .context("no bucket given (use --bucket or set session.bucket in the config)")?;
    let org = org
        .or_else(|| cfg.session.org.clone())
        .context("no organisation given (use --org or set session.org in the config)")?;

    let mut manager = driver::open_manager(cfg).await?;
    let (tx, rx) = mpsc::channel(CONTROL_QUEUE);
    let socket_path = reelup_core::control::default_control_socket_path().ok();
    let listener = socket_path
        .as_ref()
        .map(|path| control_socket::spawn_control_listener(tx, path));

    let mut queued = 0usize;
    for path in paths {
        let file = LocalFile::open(path)
            .await
            .with_context(|| format!("open {}", path.display()))?;
        let request = EnqueueRequest {
            org: org.clone(),
            bucket: bucket.clone(),
        };
        match manager.enqueue(Arc::new(file), request).await {
            Ok(id) => {
                println!("Queued job {id}: {}", path.display());
                queued += 1;
            }
            Err(e) => eprintln!("Could not queue {}: {:#}", path.display(), e),
        }
    }

    let outcome = if queued > 0 {
        driver::drive(manager, rx).await?
    } else {
        DriveOutcome::Idle
    };

    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }

    if queued == 0 {
        anyhow::bail!("no files were queued");
    }
    if outcome == DriveOutcome::Interrupted {
        println!("Resume later with `reelup resume <id> <path>`.");
    }
    Ok(())
}
