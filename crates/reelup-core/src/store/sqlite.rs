//! SQLite-backed job store (sqlx).
//!
//! The database file is stored under the XDG state directory:
//! `~/.local/state/reelup/jobs.db`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::job::{Checkpoint, FileMeta, JobId, JobState, PersistedJobRecord};
use crate::session::TemporaryCredentials;

use super::JobStore;

/// Identifies this store in `store_meta`.
pub const STORE_NAME: &str = "reelup-jobs";
/// Bumped whenever the `upload_jobs` layout changes incompatibly.
pub const STORE_VERSION: i64 = 1;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite job table.
#[derive(Clone)]
pub struct SqliteJobStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl SqliteJobStore {
    /// Open (or create) the default store and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("reelup")?;
        let db_path = xdg_dirs
            .place_state_file("jobs.db")
            .context("create state directory")?;
        Self::open_at(db_path).await
    }

    /// Open (or create) the store at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await
            .with_context(|| format!("open job store {}", path.display()))?;
        let store = SqliteJobStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the schema. A store written by a different schema version is
    /// incompatible: its job table is dropped and recreated.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_meta (
                name TEXT PRIMARY KEY,
                version INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let existing: Option<i64> =
            sqlx::query("SELECT version FROM store_meta WHERE name = ?1")
                .bind(STORE_NAME)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.get("version"));

        if let Some(version) = existing.filter(|v| *v != STORE_VERSION) {
            tracing::warn!(
                found = version,
                expected = STORE_VERSION,
                "incompatible job store version, discarding persisted jobs"
            );
            sqlx::query("DROP TABLE IF EXISTS upload_jobs")
                .execute(&mut *tx)
                .await?;
        }

        // - `credentials_json` holds the temporary credentials as JSON.
        // - `checkpoint_json` holds the multipart upload id and acknowledged parts.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_jobs (
                id INTEGER PRIMARY KEY,
                bucket TEXT NOT NULL,
                storage_key TEXT NOT NULL,
                state TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                credentials_json TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                checkpoint_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO store_meta (name, version) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET version = excluded.version
            "#,
        )
        .bind(STORE_NAME)
        .bind(STORE_VERSION)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Stored schema version (None if the meta row is missing).
    pub async fn stored_version(&self) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT version FROM store_meta WHERE name = ?1")
            .bind(STORE_NAME)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("version")))
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PersistedJobRecord> {
    let id: i64 = row.get("id");
    let state_str: String = row.get("state");
    let progress: i64 = row.get("progress");
    let credentials_json: String = row.get("credentials_json");
    let file_size: i64 = row.get("file_size");
    let checkpoint_json: Option<String> = row.get("checkpoint_json");

    let credentials: TemporaryCredentials = serde_json::from_str(&credentials_json)
        .with_context(|| format!("credentials of job {}", id))?;
    let checkpoint = checkpoint_json
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(serde_json::from_str::<Checkpoint>)
        .transpose()
        .with_context(|| format!("checkpoint of job {}", id))?;

    Ok(PersistedJobRecord {
        id,
        bucket: row.get("bucket"),
        storage_key: row.get("storage_key"),
        state: JobState::from_str(&state_str),
        progress: progress.clamp(0, 100) as u8,
        credentials,
        file_meta: FileMeta {
            name: row.get("file_name"),
            size: file_size.max(0) as u64,
            mime: row.get("file_type"),
        },
        checkpoint,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn upsert(&self, record: &PersistedJobRecord) -> Result<()> {
        let credentials_json = serde_json::to_string(&record.credentials)?;
        let checkpoint_json = record
            .checkpoint
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO upload_jobs (
                id, bucket, storage_key, state, progress,
                credentials_json, file_name, file_size, file_type,
                checkpoint_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                bucket = excluded.bucket,
                storage_key = excluded.storage_key,
                state = excluded.state,
                progress = excluded.progress,
                credentials_json = excluded.credentials_json,
                file_name = excluded.file_name,
                file_size = excluded.file_size,
                file_type = excluded.file_type,
                checkpoint_json = excluded.checkpoint_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id)
        .bind(&record.bucket)
        .bind(&record.storage_key)
        .bind(record.state.as_str())
        .bind(record.progress as i64)
        .bind(credentials_json)
        .bind(&record.file_meta.name)
        .bind(record.file_meta.size as i64)
        .bind(&record.file_meta.mime)
        .bind(checkpoint_json)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedJobRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, bucket, storage_key, state, progress,
                credentials_json, file_name, file_size, file_type,
                checkpoint_json, created_at, updated_at
            FROM upload_jobs
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match record_from_row(&row) {
                Ok(record) => out.push(record),
                Err(e) => tracing::warn!("skipping unreadable job record: {:#}", e),
            }
        }
        Ok(out)
    }

    async fn delete(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM upload_jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn max_id(&self) -> Result<Option<JobId>> {
        let row = sqlx::query("SELECT MAX(id) AS max_id FROM upload_jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<Option<i64>, _>("max_id"))
    }
}

#[cfg(test)]
/// Open an in-memory store for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<SqliteJobStore> {
    // Single connection to avoid the in-memory pool handing back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = SqliteJobStore { pool };
    store.migrate().await?;
    Ok(store)
}
