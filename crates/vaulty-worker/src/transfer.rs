//! Transfer of source items into an archive vault or an object store container.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use vaulty_core::models::SourceItem;
use vaulty_core::{ItemError, WorkflowError};
use vaulty_services::{ArchiveService, ContentProvider};
use vaulty_storage::{ContainerCreation, Storage};

use crate::processor::ItemProcessor;

/// Archive descriptions are limited to 1024 printable ASCII characters.
const MAX_DESCRIPTION_LEN: usize = 1024;

/// Where transferred payloads are written.
#[async_trait]
pub trait TransferDestination: Send + Sync {
    fn container(&self) -> &str;

    /// Write one payload and return the destination's result for the ledger. Repeating a
    /// write for the same `key` overwrites or is tolerated, never an error by itself.
    async fn upload(
        &self,
        key: &str,
        item: &SourceItem,
        payload: Bytes,
    ) -> Result<serde_json::Value, ItemError>;
}

/// Uploads each payload as a new archive in a vault.
pub struct ArchiveDestination {
    archive: Arc<dyn ArchiveService>,
    vault: String,
}

impl ArchiveDestination {
    pub fn new(archive: Arc<dyn ArchiveService>, vault: impl Into<String>) -> Self {
        Self {
            archive,
            vault: vault.into(),
        }
    }
}

/// Description stored with an archive: the item's natural id, reduced to printable ASCII.
pub fn archive_description(item: &SourceItem) -> String {
    item.id
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '_' })
        .take(MAX_DESCRIPTION_LEN)
        .collect()
}

#[async_trait]
impl TransferDestination for ArchiveDestination {
    fn container(&self) -> &str {
        &self.vault
    }

    async fn upload(
        &self,
        key: &str,
        item: &SourceItem,
        payload: Bytes,
    ) -> Result<serde_json::Value, ItemError> {
        let receipt = self
            .archive
            .upload(&self.vault, &archive_description(item), payload)
            .await?;
        tracing::debug!(key = %key, archive_id = %receipt.archive_id, "Payload archived");
        serde_json::to_value(receipt).map_err(|e| ItemError::Rejected(e.to_string()))
    }
}

/// Writes each payload as an object in a container.
pub struct BucketDestination {
    storage: Arc<dyn Storage>,
    bucket: String,
}

impl BucketDestination {
    pub fn new(storage: Arc<dyn Storage>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }
}

/// Object key for an item: its natural id without leading slashes.
pub fn object_key(item: &SourceItem) -> &str {
    item.id.trim_start_matches('/')
}

#[async_trait]
impl TransferDestination for BucketDestination {
    fn container(&self) -> &str {
        &self.bucket
    }

    async fn upload(
        &self,
        key: &str,
        item: &SourceItem,
        payload: Bytes,
    ) -> Result<serde_json::Value, ItemError> {
        let receipt = self
            .storage
            .put_bytes(&self.bucket, object_key(item), payload)
            .await?;
        tracing::debug!(key = %key, object = %receipt.key, "Payload stored");
        serde_json::to_value(receipt).map_err(|e| ItemError::Rejected(e.to_string()))
    }
}

/// Download from the provider, then upload to the destination.
pub struct TransferExecutor<'a> {
    provider: &'a dyn ContentProvider,
    destination: &'a dyn TransferDestination,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(provider: &'a dyn ContentProvider, destination: &'a dyn TransferDestination) -> Self {
        Self {
            provider,
            destination,
        }
    }
}

#[async_trait]
impl ItemProcessor<SourceItem> for TransferExecutor<'_> {
    #[tracing::instrument(skip(self, item), fields(id = %item.id, container = %self.destination.container()))]
    async fn process(&self, item: &SourceItem) -> Result<serde_json::Value, ItemError> {
        let start = std::time::Instant::now();
        let payload = self.provider.download(item).await?;
        let size = payload.len();
        let result = self
            .destination
            .upload(&item.ledger_key(), item, payload)
            .await?;

        tracing::info!(
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Item transferred"
        );
        Ok(result)
    }
}

/// Create the vault unless it already exists. Returns whether it was created.
pub async fn ensure_vault(archive: &dyn ArchiveService, vault: &str) -> Result<bool, WorkflowError> {
    let container_error = |source| WorkflowError::Container {
        container: vault.to_string(),
        source,
    };

    let existing = archive.list_containers().await.map_err(container_error)?;
    if existing.iter().any(|v| v.vault_name == vault) {
        tracing::info!(vault = %vault, "Vault exists, creation skipped");
        return Ok(false);
    }

    archive.create_container(vault).await.map_err(container_error)?;
    tracing::info!(vault = %vault, "Vault created");
    Ok(true)
}

/// Create the private bucket unless it already exists. Returns whether it was created.
pub async fn ensure_bucket(storage: &dyn Storage, bucket: &str) -> Result<bool, WorkflowError> {
    match storage.create_private_container(bucket).await {
        Ok(ContainerCreation::Created) => Ok(true),
        Ok(ContainerCreation::AlreadyExists) => {
            tracing::info!(bucket = %bucket, "Bucket exists, creation skipped");
            Ok(false)
        }
        Err(e) => Err(WorkflowError::Container {
            container: bucket.to_string(),
            source: e.into(),
        }),
    }
}
