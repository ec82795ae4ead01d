//! Object store abstraction trait
//!
//! This module defines the Storage trait that every object store backend implements.
//! Containers are buckets (S3) or top-level directories (local).

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::path::Path;
use thiserror::Error;
use vaulty_core::models::PutReceipt;
use vaulty_core::ItemError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ItemError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::InvalidKey(_) => ItemError::InvalidPayload(message),
            StorageError::AccessDenied(_) => ItemError::Unauthorized(message),
            StorageError::NotFound(_)
            | StorageError::ContainerNotFound(_)
            | StorageError::ConfigError(_) => ItemError::Rejected(message),
            StorageError::UploadFailed(_)
            | StorageError::DownloadFailed(_)
            | StorageError::BackendError(_)
            | StorageError::IoError(_) => ItemError::Transient(message),
        }
    }
}

/// Outcome of [`Storage::create_private_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerCreation {
    Created,
    AlreadyExists,
}

/// One object listed from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub e_tag: Option<String>,
}

/// Lazy listing of a container's objects.
pub type ObjectStream = BoxStream<'static, StorageResult<ObjectInfo>>;

/// Object store abstraction trait
///
/// All backends (S3, local filesystem) implement this trait, so the bucket workflows never
/// couple to a specific provider.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a container that is not publicly readable. An existing container owned by
    /// the caller is reported as [`ContainerCreation::AlreadyExists`], not as an error.
    async fn create_private_container(&self, container: &str) -> StorageResult<ContainerCreation>;

    /// Names of all containers, sorted.
    async fn list_containers(&self) -> StorageResult<Vec<String>>;

    /// Lazily list every object of a container.
    async fn list_contents(&self, container: &str) -> StorageResult<ObjectStream>;

    /// Read a whole object.
    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Bytes>;

    /// Upload a local file. Writing an existing key overwrites it.
    async fn put_object(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> StorageResult<PutReceipt>;

    /// Upload an in-memory payload. Writing an existing key overwrites it.
    async fn put_bytes(&self, container: &str, key: &str, data: Bytes)
        -> StorageResult<PutReceipt>;

    async fn exists(&self, container: &str, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
