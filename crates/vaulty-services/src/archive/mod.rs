//! Cold-storage archive service abstraction.

#[cfg(feature = "aws")]
pub mod glacier;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use vaulty_core::models::{ArchiveReceipt, JobKind, JobSummary, TopicRef, VaultSummary};
use vaulty_core::ItemError;

#[cfg(feature = "aws")]
pub use glacier::GlacierArchive;

/// Operations the workflows need from a cold-storage archive.
///
/// Container-level calls fail with `anyhow` errors that the caller turns into fatal
/// workflow errors. Per-item calls (`upload`, `delete_item`) return [`ItemError`] so the
/// runner can isolate them.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Create a container. Creating an existing container succeeds without change.
    async fn create_container(&self, container: &str) -> Result<()>;

    async fn list_containers(&self) -> Result<Vec<VaultSummary>>;

    /// Start a long-running job whose completion is published to `topic`.
    async fn submit_retrieval_job(
        &self,
        container: &str,
        kind: JobKind,
        topic: &TopicRef,
    ) -> Result<String>;

    /// Raw output of a completed job.
    async fn get_job_output(&self, container: &str, job_id: &str) -> Result<Bytes>;

    /// Delete one archive. A missing archive is reported as [`ItemError::AlreadyGone`].
    async fn delete_item(&self, container: &str, item_id: &str) -> Result<(), ItemError>;

    /// Publish the container's job completion events to `topic`.
    async fn attach_notification_target(&self, container: &str, topic: &TopicRef) -> Result<()>;

    async fn detach_notification_target(&self, container: &str) -> Result<()>;

    async fn list_jobs(&self, container: &str) -> Result<Vec<JobSummary>>;

    async fn upload(
        &self,
        container: &str,
        description: &str,
        payload: Bytes,
    ) -> Result<ArchiveReceipt, ItemError>;
}
