//! `reelup status` – show status of all jobs.

use anyhow::Result;
use reelup_core::store::{JobStore, SqliteJobStore};

/// Reads the store directly so a running session is left alone.
pub async fn run_status() -> Result<()> {
    let store = SqliteJobStore::open_default().await?;
    let jobs = store.load_all().await?;
    if jobs.is_empty() {
        println!("No upload jobs.");
        return Ok(());
    }
    println!(
        "{:<6} {:<10} {:>5} {:>12}  {}",
        "ID", "STATE", "PCT", "SIZE", "KEY"
    );
    for j in jobs {
        println!(
            "{:<6} {:<10} {:>4}% {:>12}  {}/{}",
            j.id,
            j.state.as_str(),
            j.progress,
            j.file_meta.size,
            j.bucket,
            j.storage_key
        );
    }
    Ok(())
}
