//! CLI for the reelup upload manager.

mod commands;
mod control_socket;
mod driver;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use reelup_core::config;
use std::path::PathBuf;

use commands::{
    run_cancel, run_completions, run_pause, run_remove, run_resume, run_status, run_upload,
};

/// Top-level CLI for the reelup upload manager.
#[derive(Debug, Parser)]
#[command(name = "reelup")]
#[command(about = "reelup: resumable multipart media uploads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue files for upload and run until every upload settles.
    Upload {
        /// Files to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target bucket (defaults to `session.bucket` from the config).
        #[arg(long)]
        bucket: Option<String>,
        /// Organisation (defaults to `session.org` from the config).
        #[arg(long)]
        org: Option<String>,
    },

    /// Show status of all jobs.
    Status,

    /// Re-attach a file to a paused, failed, or restored job and run it.
    Resume {
        /// Job identifier.
        id: i64,
        /// The job's file.
        path: PathBuf,
    },

    /// Pause a queued or uploading job.
    Pause {
        /// Job identifier.
        id: i64,
    },

    /// Cancel a job. Cancelled jobs never run again.
    Cancel {
        /// Job identifier.
        id: i64,
    },

    /// Remove a job and its record, whatever its state.
    Remove {
        /// Job identifier.
        id: i64,
    },

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                paths,
                bucket,
                org,
            } => run_upload(&cfg, &paths, bucket, org).await?,
            CliCommand::Status => run_status().await?,
            CliCommand::Resume { id, path } => run_resume(&cfg, id, &path).await?,
            CliCommand::Pause { id } => run_pause(&cfg, id).await?,
            CliCommand::Cancel { id } => run_cancel(&cfg, id).await?,
            CliCommand::Remove { id } => run_remove(&cfg, id).await?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}
