use crate::traits::{ContainerCreation, ObjectInfo, ObjectStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use vaulty_core::models::PutReceipt;

/// Local filesystem storage implementation
///
/// Each container is a directory directly under `base_path`; object keys map to relative
/// paths inside it.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    fn container_path(&self, container: &str) -> StorageResult<PathBuf> {
        if container.is_empty()
            || container.contains(['/', '\\'])
            || container == "."
            || container == ".."
        {
            return Err(StorageError::InvalidKey(format!(
                "Invalid container name: {}",
                container
            )));
        }
        Ok(self.base_path.join(container))
    }

    /// Convert container and key to a filesystem path, rejecting keys that would escape
    /// the container directory.
    fn key_to_path(&self, container: &str, key: &str) -> StorageResult<PathBuf> {
        let root = self.container_path(container)?;
        let relative = Path::new(key);

        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(root.join(relative))
    }

    async fn require_container(&self, container: &str) -> StorageResult<PathBuf> {
        let root = self.container_path(container)?;
        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Err(StorageError::ContainerNotFound(container.to_string()));
        }
        Ok(root)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn receipt(container: &str, key: &str) -> PutReceipt {
        PutReceipt {
            container: container.to_string(),
            key: key.to_string(),
            e_tag: None,
        }
    }
}

/// Every regular file under `root`, as keys relative to it, sorted.
async fn walk_files(root: PathBuf) -> StorageResult<Vec<ObjectInfo>> {
    let mut objects = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let path = entry.path();
            if meta.is_dir() {
                pending.push(path);
            } else if meta.is_file() {
                let key = path
                    .strip_prefix(&root)
                    .map_err(|e| StorageError::BackendError(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                objects.push(ObjectInfo {
                    key,
                    size: meta.len(),
                    e_tag: None,
                });
            }
        }
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects)
}

#[async_trait]
impl Storage for LocalStorage {
    async fn create_private_container(&self, container: &str) -> StorageResult<ContainerCreation> {
        let path = self.container_path(container)?;

        if fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(container = %container, "Local container already exists");
            return Ok(ContainerCreation::AlreadyExists);
        }

        fs::create_dir_all(&path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700)).await?;
        }

        tracing::info!(container = %container, path = %path.display(), "Local container created");
        Ok(ContainerCreation::Created)
    }

    async fn list_containers(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.metadata().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_contents(&self, container: &str) -> StorageResult<ObjectStream> {
        let root = self.require_container(container).await?;
        let objects = walk_files(root).await?;
        Ok(Box::pin(futures::stream::iter(objects.into_iter().map(Ok))))
    }

    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(container, key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", container, key)));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Bytes::from(data))
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> StorageResult<PutReceipt> {
        self.require_container(container).await?;
        let path = self.key_to_path(container, key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let size = fs::copy(local_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(Self::receipt(container, key))
    }

    async fn put_bytes(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
    ) -> StorageResult<PutReceipt> {
        self.require_container(container).await?;
        let path = self.key_to_path(container, key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(Self::receipt(container, key))
    }

    async fn exists(&self, container: &str, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(container, key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
