//! Ledger error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from ledger operations. All of them are fatal for a workflow run.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to open ledger {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to prepare ledger schema: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Ledger query failed: {0}")]
    Query(#[from] sqlx::Error),
}
