use serde::Serialize;

use crate::item_error::{ItemError, ItemErrorKind};

/// What happened to one item during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Processed now; the ledger holds the remote result.
    Processed { remote_result: serde_json::Value },
    /// Already present in the ledger; nothing was done.
    Skipped,
    /// The destination reported the item as already gone; recorded as done.
    AlreadyGone { message: String },
    /// Processing failed; the item stays pending for the next run.
    Failed { kind: ItemErrorKind, message: String },
}

impl ItemOutcome {
    pub fn failed(err: &ItemError) -> Self {
        ItemOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub key: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Aggregate of one workflow run, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub processed: usize,
    pub skipped: usize,
    pub already_gone: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn record(&mut self, report: ItemReport) {
        match report.outcome {
            ItemOutcome::Processed { .. } => self.processed += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::AlreadyGone { .. } => self.already_gone += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.items.push(report);
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
