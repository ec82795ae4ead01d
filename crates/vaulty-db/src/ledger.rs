//! SQLite-backed resumable ledger.
//!
//! The file is opened in WAL mode with `synchronous = FULL` and every write is its own
//! committed statement. A crash loses at most the insert that was in flight; earlier
//! records survive and the file reopens cleanly. [`Ledger::close`] checkpoints the WAL
//! into the main file and releases the connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::types::Json;
use vaulty_core::models::LedgerRecord;

use crate::error::LedgerError;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Outcome of [`Ledger::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    Inserted,
    /// The key was already recorded; the stored record is unchanged.
    AlreadyPresent,
}

/// Row type for the ledger_records table.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    key: String,
    source_reference: String,
    remote_result: Json<serde_json::Value>,
    recorded_at: DateTime<Utc>,
}

impl LedgerRow {
    fn into_record(self) -> LedgerRecord {
        LedgerRecord {
            key: self.key,
            source_reference: self.source_reference,
            remote_result: self.remote_result.0,
            recorded_at: self.recorded_at,
        }
    }
}

/// Persistent key to record mapping owned by one workflow run.
pub struct Ledger {
    pool: SqlitePool,
    path: PathBuf,
}

impl Ledger {
    /// Open (or create) the ledger at `path`.
    #[tracing::instrument(skip(path), fields(ledger.path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        // One connection: the ledger has exactly one writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|source| LedgerError::Open {
                path: path.clone(),
                source,
            })?;

        MIGRATOR.run(&pool).await?;

        tracing::info!(ledger.path = %path.display(), "Ledger opened");

        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn has(&self, key: &str) -> Result<bool, LedgerError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM ledger_records WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    pub async fn get(&self, key: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        let row: Option<LedgerRow> = sqlx::query_as(
            "SELECT key, source_reference, remote_result, recorded_at FROM ledger_records WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LedgerRow::into_record))
    }

    /// Record an item. A key is written at most once; later puts leave it untouched.
    #[tracing::instrument(skip(self, record), fields(ledger.key = %record.key))]
    pub async fn put(&self, record: &LedgerRecord) -> Result<LedgerWrite, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_records (key, source_reference, remote_result, recorded_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(&record.key)
        .bind(&record.source_reference)
        .bind(Json(&record.remote_result))
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Ledger key already present, record unchanged");
            Ok(LedgerWrite::AlreadyPresent)
        } else {
            Ok(LedgerWrite::Inserted)
        }
    }

    pub async fn len(&self) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len().await? == 0)
    }

    /// All records in insertion order.
    pub async fn records(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            "SELECT key, source_reference, remote_result, recorded_at FROM ledger_records ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LedgerRow::into_record).collect())
    }

    /// Flush the WAL into the database file and release the connection.
    pub async fn close(self) -> Result<(), LedgerError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        tracing::info!(ledger.path = %self.path.display(), "Ledger closed");
        Ok(())
    }
}
