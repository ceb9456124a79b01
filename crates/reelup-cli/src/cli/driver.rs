//! Wiring of the upload manager for CLI commands, and the loop that drives
//! it while printing progress.

use anyhow::{Context, Result};
use reelup_core::config::ReelupConfig;
use reelup_core::control::ControlCommand;
use reelup_core::job::{JobState, LocalFile};
use reelup_core::session::HttpSessionIssuer;
use reelup_core::status::{HttpStatusReporter, NoopStatusReporter, StatusReporter};
use reelup_core::store::SqliteJobStore;
use reelup_core::transfer::S3Transport;
use reelup_core::{Collaborators, JobUpdate, UploadManager};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};

use crate::cli::control_socket;

/// Opens the manager on the default job store with HTTP issuer, status
/// reporter, and S3 transport from `cfg`.
///
/// Fails while an upload session is running: that session owns the store,
/// and a second manager would demote its live jobs.
pub async fn open_manager(cfg: &ReelupConfig) -> Result<UploadManager> {
    if let Ok(socket_path) = reelup_core::control::default_control_socket_path() {
        ensure_store_unowned(&socket_path).await?;
    }
    let store = SqliteJobStore::open_default()
        .await
        .context("open job store")?;
    let issuer = HttpSessionIssuer::new(
        cfg.session.endpoint.as_deref(),
        cfg.session.auth_token.clone(),
    )?;
    let status: Arc<dyn StatusReporter> = match cfg.status.endpoint.as_deref() {
        Some(endpoint) => Arc::new(HttpStatusReporter::new(
            endpoint,
            cfg.session.auth_token.clone(),
        )?),
        None => Arc::new(NoopStatusReporter),
    };
    let collaborators = Collaborators {
        store: Arc::new(store),
        issuer: Arc::new(issuer),
        transport: Arc::new(S3Transport::new(&cfg.storage)),
        status,
    };
    Ok(UploadManager::open(cfg, collaborators).await?)
}

async fn ensure_store_unowned(socket_path: &Path) -> Result<()> {
    if control_socket::session_listening(socket_path).await {
        anyhow::bail!(
            "an upload session is running (control socket {}); wait for it to finish",
            socket_path.display()
        );
    }
    Ok(())
}

/// How a drive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    Idle,
    Interrupted,
}

/// Processes transfer events and control commands until no job is
/// uploading or Ctrl-C is pressed. On Ctrl-C running jobs are paused.
pub async fn drive(
    mut manager: UploadManager,
    mut commands: mpsc::Receiver<ControlCommand>,
) -> Result<DriveOutcome> {
    let mut updates = manager.subscribe();
    let mut persist_errors = manager.persistence_errors();
    tracing::info!(
        max_concurrent = manager.max_concurrent_uploads(),
        uploading = manager.uploading_count(),
        "driving uploads"
    );
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            more = manager.process_next_event() => {
                if !more {
                    break DriveOutcome::Idle;
                }
            }
            Some(cmd) = commands.recv() => apply_command(&mut manager, cmd).await,
            _ = &mut ctrl_c => break DriveOutcome::Interrupted,
        }
        print_updates(&mut updates);
        print_persist_errors(&mut persist_errors);
    };

    match outcome {
        DriveOutcome::Idle => manager.flush().await,
        DriveOutcome::Interrupted => {
            println!("Interrupted; pausing running uploads.");
            manager.shutdown().await;
        }
    }
    print_updates(&mut updates);
    print_persist_errors(&mut persist_errors);
    Ok(outcome)
}

async fn apply_command(manager: &mut UploadManager, cmd: ControlCommand) {
    let applied = match &cmd {
        ControlCommand::Pause(id) => manager.pause(*id),
        ControlCommand::Cancel(id) => manager.cancel(*id),
        ControlCommand::Remove(id) => manager.remove(*id),
        ControlCommand::Resume { id, path } => match LocalFile::open(path).await {
            Ok(file) => manager.resume(*id, Arc::new(file)),
            Err(e) => {
                tracing::warn!(command = %cmd, "cannot open file: {}", e);
                println!("Ignored `{}`: {}", cmd, e);
                return;
            }
        },
    };
    tracing::info!(command = %cmd, applied, "control command");
    if !applied {
        println!("Ignored `{}`: no such job or not applicable", cmd);
    }
}

fn print_updates(updates: &mut broadcast::Receiver<JobUpdate>) {
    loop {
        match updates.try_recv() {
            Ok(JobUpdate::Changed(job)) => {
                let pct = match job.state {
                    JobState::Uploading | JobState::Paused => format!(" {:>3}%", job.progress_percent),
                    _ => String::new(),
                };
                println!(
                    "[{}] {}{}  {}",
                    job.id, job.state, pct, job.file_meta.name
                );
            }
            Ok(JobUpdate::Removed(id)) => println!("[{}] removed", id),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
            }
            Err(_) => break,
        }
    }
}

fn print_persist_errors(errors: &mut broadcast::Receiver<reelup_core::store::PersistenceError>) {
    loop {
        match errors.try_recv() {
            Ok(err) => eprintln!("warning: {}", err),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}
