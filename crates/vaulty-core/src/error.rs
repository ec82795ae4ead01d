//! Error types module
//!
//! Fatal workflow errors. Anything represented here aborts the run with a non-zero exit:
//! a broken notification chain would leave the coordinator waiting forever, a missing job
//! id leaves nothing to wait for, and a ledger failure would silently break resumption.
//! Per-item failures are not in this enum; see [`crate::ItemError`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::models::JobState;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes such as an operator cancelling a wait
    Warn,
    /// Unexpected failures
    Error,
}

/// Individual link of the notification chain, named in setup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    CreateTopic,
    AttachNotifications,
    CreateQueue,
    AuthorizePublish,
    Subscribe,
}

impl Display for SetupStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SetupStep::CreateTopic => write!(f, "create notification topic"),
            SetupStep::AttachNotifications => write!(f, "attach vault notifications"),
            SetupStep::CreateQueue => write!(f, "create queue"),
            SetupStep::AuthorizePublish => write!(f, "authorize topic to publish to queue"),
            SetupStep::Subscribe => write!(f, "subscribe queue to topic"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Setup failed at step '{step}': {source}")]
    Setup {
        step: SetupStep,
        #[source]
        source: anyhow::Error,
    },

    #[error("Job submission failed for vault '{container}': {source}")]
    JobSubmission {
        container: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No notification for job {job_id} within {waited:?}")]
    ListenTimeout { job_id: String, waited: Duration },

    #[error("Wait for job {job_id} was cancelled")]
    Cancelled { job_id: String },

    /// An item run stopped between two items. Everything before is in the ledger.
    #[error("{action} run on '{container}' interrupted after {completed} items")]
    Interrupted {
        action: String,
        container: String,
        completed: usize,
    },

    #[error("Job {job_id} completed with status {status_code}: {message}")]
    JobFailed {
        job_id: String,
        status_code: String,
        message: String,
    },

    #[error("Failed to receive notifications: {0}")]
    Receive(#[source] anyhow::Error),

    #[error("Failed to fetch output of job {job_id}: {source}")]
    JobOutput {
        job_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Job handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[source] anyhow::Error),

    #[error("Source listing failed on page {page}: {source}")]
    Listing {
        page: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to prepare container '{container}': {source}")]
    Container {
        container: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkflowError {
    /// Terminal coordinator state this error leaves a job in, if it comes from the
    /// coordinator at all.
    pub fn state(&self) -> Option<JobState> {
        match self {
            WorkflowError::Setup { .. } | WorkflowError::JobSubmission { .. } => {
                Some(JobState::SetupFailed)
            }
            WorkflowError::ListenTimeout { .. } => Some(JobState::ListenTimeout),
            WorkflowError::Receive(_) => Some(JobState::ListenFailed),
            WorkflowError::Cancelled { .. } => Some(JobState::Cancelled),
            WorkflowError::JobFailed { .. } => Some(JobState::JobFailed),
            WorkflowError::JobOutput { .. } | WorkflowError::Handler(_) => {
                Some(JobState::NotificationReceived)
            }
            WorkflowError::Ledger(_)
            | WorkflowError::Interrupted { .. }
            | WorkflowError::Listing { .. }
            | WorkflowError::Container { .. }
            | WorkflowError::Config(_) => None,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            WorkflowError::Cancelled { .. } | WorkflowError::Interrupted { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    pub fn ledger(err: impl Into<anyhow::Error>) -> Self {
        WorkflowError::Ledger(err.into())
    }
}
