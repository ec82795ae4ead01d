//! Per-item processors and bulk processing of job results.
//!
//! An [`ItemProcessor`] performs one action on one item. The [`BulkResultProcessor`] drives
//! a processor over a whole result list through an [`ItemRunner`], so one item's failure
//! never stops the others. [`InventorySweep`] is the [`JobHandler`] that feeds an
//! inventory job's output into a bulk run.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use vaulty_core::models::{InventoryEntry, JobDescriptor, LedgerRecord, RunReport, SourceItem, VaultInventory};
use vaulty_core::{ItemError, WorkflowError};
use vaulty_services::ArchiveService;

use crate::coordinator::JobHandler;
use crate::runner::ItemRunner;

/// An item that can be tracked in a ledger.
pub trait WorkItem {
    /// Natural identifier the ledger key is derived from.
    fn natural_id(&self) -> &str;

    /// Upstream reference stored with the ledger record.
    fn source_reference(&self) -> &str {
        self.natural_id()
    }
}

impl WorkItem for SourceItem {
    fn natural_id(&self) -> &str {
        &self.id
    }
}

impl WorkItem for InventoryEntry {
    fn natural_id(&self) -> &str {
        &self.archive_id
    }
}

/// A record of an upload ledger, replayed to undo the upload.
impl WorkItem for LedgerRecord {
    fn natural_id(&self) -> &str {
        self.archive_id().unwrap_or(&self.key)
    }

    fn source_reference(&self) -> &str {
        &self.source_reference
    }
}

/// One follow-up action on one item, returning the remote result to record.
#[async_trait]
pub trait ItemProcessor<I: Sync>: Send + Sync {
    async fn process(&self, item: &I) -> Result<serde_json::Value, ItemError>;
}

/// Deletes archives from a vault.
pub struct DeleteArchive {
    archive: Arc<dyn ArchiveService>,
    vault: String,
}

impl DeleteArchive {
    pub fn new(archive: Arc<dyn ArchiveService>, vault: impl Into<String>) -> Self {
        Self {
            archive,
            vault: vault.into(),
        }
    }

    async fn delete(&self, archive_id: &str) -> Result<serde_json::Value, ItemError> {
        self.archive.delete_item(&self.vault, archive_id).await?;
        tracing::info!(vault = %self.vault, archive_id = %archive_id, "Archive deleted");
        Ok(json!({ "deleted": archive_id }))
    }
}

#[async_trait]
impl ItemProcessor<InventoryEntry> for DeleteArchive {
    async fn process(&self, item: &InventoryEntry) -> Result<serde_json::Value, ItemError> {
        self.delete(&item.archive_id).await
    }
}

#[async_trait]
impl ItemProcessor<LedgerRecord> for DeleteArchive {
    async fn process(&self, item: &LedgerRecord) -> Result<serde_json::Value, ItemError> {
        let archive_id = item.archive_id().ok_or_else(|| {
            ItemError::InvalidPayload(format!(
                "Ledger record for {} holds no archive id",
                item.source_reference
            ))
        })?;
        self.delete(archive_id).await
    }
}

/// Projects an inventory entry into the record stored in a catalog ledger.
pub struct CatalogEntry;

#[async_trait]
impl ItemProcessor<InventoryEntry> for CatalogEntry {
    async fn process(&self, item: &InventoryEntry) -> Result<serde_json::Value, ItemError> {
        serde_json::to_value(item).map_err(|e| ItemError::InvalidPayload(e.to_string()))
    }
}

/// Runs one processor over every entry of a result list.
pub struct BulkResultProcessor<'a> {
    runner: ItemRunner<'a>,
}

impl<'a> BulkResultProcessor<'a> {
    pub fn new(runner: ItemRunner<'a>) -> Self {
        Self { runner }
    }

    /// Process every item in order. Item failures are recorded in the report; ledger
    /// failures and cancellation of the runner abort the run.
    pub async fn process_all<I, P>(&self, items: &[I], processor: &P) -> Result<RunReport, WorkflowError>
    where
        I: WorkItem + Sync,
        P: ItemProcessor<I> + ?Sized,
    {
        let mut report = RunReport::default();
        for item in items {
            self.runner.ensure_running(&report)?;
            self.runner.run_item(item, processor, &mut report).await?;
        }

        tracing::info!(
            action = %self.runner.action(),
            container = %self.runner.container(),
            processed = report.processed,
            skipped = report.skipped,
            already_gone = report.already_gone,
            failed = report.failed,
            "Bulk processing finished"
        );
        Ok(report)
    }
}

/// Handler for inventory jobs: parses the inventory and processes every archive in it.
pub struct InventorySweep<'a, P> {
    bulk: BulkResultProcessor<'a>,
    processor: P,
}

impl<'a, P> InventorySweep<'a, P>
where
    P: ItemProcessor<InventoryEntry>,
{
    pub fn new(runner: ItemRunner<'a>, processor: P) -> Self {
        Self {
            bulk: BulkResultProcessor::new(runner),
            processor,
        }
    }
}

#[async_trait]
impl<'a, P> JobHandler for InventorySweep<'a, P>
where
    P: ItemProcessor<InventoryEntry>,
{
    type Output = RunReport;

    async fn handle(&self, job: &JobDescriptor, output: Bytes) -> Result<RunReport, WorkflowError> {
        let inventory = VaultInventory::from_json(&output).map_err(|e| {
            WorkflowError::Handler(anyhow::anyhow!(
                "Output of job {} is not a vault inventory: {}",
                job.job_id.as_deref().unwrap_or("-"),
                e
            ))
        })?;

        tracing::info!(
            vault = %job.target_container,
            inventory_date = ?inventory.inventory_date,
            archives = inventory.archive_list.len(),
            "Inventory received"
        );

        self.bulk
            .process_all(&inventory.archive_list, &self.processor)
            .await
    }
}
