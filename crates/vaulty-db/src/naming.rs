//! File names for ledgers and inventory catalogs.

use chrono::{DateTime, Local};

/// `{kind}_{container}_{YYYY-mm-dd-HH-MM-SS}.db`, e.g. `upload_videos_openhpi_2024-03-01-12-00-00.db`.
pub fn ledger_file_name(kind: &str, container: &str, at: DateTime<Local>) -> String {
    format!("{}_{}_{}.db", kind, container, at.format("%Y-%m-%d-%H-%M-%S"))
}

/// Catalog written by an inventory sweep: `{container}_inventory.db`.
pub fn catalog_file_name(container: &str) -> String {
    format!("{}_inventory.db", container)
}
