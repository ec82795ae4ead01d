//! The shared per-item step: skip what the ledger already holds, process the rest, record
//! successes, and report every outcome.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use vaulty_core::models::{ItemOutcome, ItemReport, LedgerRecord, RunReport};
use vaulty_core::{ledger_key, ItemError, ProgressReporter, WorkflowError};
use vaulty_db::{Ledger, LedgerWrite};

use crate::processor::{ItemProcessor, WorkItem};

/// Per-run context for processing items one at a time.
pub struct ItemRunner<'a> {
    action: &'a str,
    container: &'a str,
    ledger: Option<&'a Ledger>,
    reporter: &'a dyn ProgressReporter,
    cancel: Option<CancellationToken>,
}

impl<'a> ItemRunner<'a> {
    pub fn new(action: &'a str, container: &'a str, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            action,
            container,
            ledger: None,
            reporter,
            cancel: None,
        }
    }

    /// Track items in `ledger`: recorded items are skipped, new successes are recorded.
    pub fn with_ledger(mut self, ledger: &'a Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Stop between items once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fails with [`WorkflowError::Interrupted`] once cancellation was requested.
    /// `report` holds what was completed so far.
    pub fn ensure_running(&self, report: &RunReport) -> Result<(), WorkflowError> {
        match &self.cancel {
            Some(cancel) if cancel.is_cancelled() => {
                tracing::warn!(
                    action = %self.action,
                    container = %self.container,
                    completed = report.total(),
                    "Run interrupted, ledger holds everything completed so far"
                );
                Err(WorkflowError::Interrupted {
                    action: self.action.to_string(),
                    container: self.container.to_string(),
                    completed: report.total(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn action(&self) -> &str {
        self.action
    }

    pub fn container(&self) -> &str {
        self.container
    }

    /// Process one item and add its outcome to `report`.
    ///
    /// Item errors are contained here. The only error returned is a ledger failure, which
    /// is fatal because continuing would break resumption.
    pub async fn run_item<I, P>(
        &self,
        item: &I,
        processor: &P,
        report: &mut RunReport,
    ) -> Result<(), WorkflowError>
    where
        I: WorkItem + Sync,
        P: ItemProcessor<I> + ?Sized,
    {
        let id = item.natural_id();
        let key = ledger_key(id);

        if let Some(ledger) = self.ledger {
            if ledger.has(&key).await.map_err(WorkflowError::ledger)? {
                tracing::debug!(action = %self.action, id = %id, key = %key, "Already in ledger, skipping");
                return Ok(self.finish(report, id, key, ItemOutcome::Skipped));
            }
        }

        let outcome = match processor.process(item).await {
            Ok(remote_result) => {
                self.record(&key, item, remote_result.clone()).await?;
                ItemOutcome::Processed { remote_result }
            }
            Err(ItemError::AlreadyGone(message)) => {
                self.record(
                    &key,
                    item,
                    json!({ "already_gone": true, "message": message }),
                )
                .await?;
                ItemOutcome::AlreadyGone { message }
            }
            Err(err) => {
                tracing::error!(
                    action = %self.action,
                    container = %self.container,
                    id = %id,
                    key = %key,
                    kind = %err.kind(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "Item failed, continuing with the next one"
                );
                ItemOutcome::failed(&err)
            }
        };

        Ok(self.finish(report, id, key, outcome))
    }

    async fn record<I: WorkItem>(
        &self,
        key: &str,
        item: &I,
        remote_result: serde_json::Value,
    ) -> Result<(), WorkflowError> {
        let Some(ledger) = self.ledger else {
            return Ok(());
        };

        let record = LedgerRecord::new(key, item.source_reference(), remote_result);
        match ledger.put(&record).await.map_err(WorkflowError::ledger)? {
            LedgerWrite::Inserted => {}
            LedgerWrite::AlreadyPresent => {
                tracing::warn!(key = %key, "Ledger already held this key, earlier record kept");
            }
        }
        Ok(())
    }

    fn finish(&self, report: &mut RunReport, id: &str, key: String, outcome: ItemOutcome) {
        let item_report = ItemReport {
            id: id.to_string(),
            key,
            outcome,
        };
        self.reporter
            .item_finished(self.action, self.container, &item_report);
        report.record(item_report);
    }
}
