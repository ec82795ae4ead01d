//! Progress hooks
//!
//! Workflows report every item outcome through a [`ProgressReporter`] as soon as it is
//! known, so long sweeps show progress instead of a single summary at the end. The CLI
//! prints each line; library callers can use the tracing or no-op reporters.

use crate::models::{ItemOutcome, ItemReport};

/// Receives per-item outcomes in processing order.
pub trait ProgressReporter: Send + Sync {
    /// Called once per item, right after its outcome is final.
    fn item_finished(&self, action: &str, container: &str, report: &ItemReport);
}

/// Reporter that discards everything.
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn item_finished(&self, _action: &str, _container: &str, _report: &ItemReport) {}
}

/// Reporter that emits one tracing event per item.
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn item_finished(&self, action: &str, container: &str, report: &ItemReport) {
        match &report.outcome {
            ItemOutcome::Processed { .. } => tracing::info!(
                action = %action,
                container = %container,
                id = %report.id,
                "Item processed"
            ),
            ItemOutcome::Skipped => tracing::debug!(
                action = %action,
                container = %container,
                id = %report.id,
                "Item already in ledger, skipped"
            ),
            ItemOutcome::AlreadyGone { message } => tracing::info!(
                action = %action,
                container = %container,
                id = %report.id,
                message = %message,
                "Item already gone"
            ),
            ItemOutcome::Failed { kind, message } => tracing::error!(
                action = %action,
                container = %container,
                id = %report.id,
                kind = %kind,
                error = %message,
                "Item failed"
            ),
        }
    }
}
