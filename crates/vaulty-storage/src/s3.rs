use crate::traits::{ContainerCreation, ObjectInfo, ObjectStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use vaulty_core::models::PutReceipt;

/// S3 storage implementation
///
/// Object reads and writes go through `object_store`, one store per bucket. Bucket-level
/// operations (create, list) use the S3 SDK client directly.
#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = endpoint_url {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(S3Storage {
            client: aws_sdk_s3::Client::from_conf(s3_config.build()),
            region,
            endpoint_url,
        })
    }

    fn store(&self, bucket: &str) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket.to_string());

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }

    fn location(key: &str) -> StorageResult<Path> {
        Path::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    async fn put_payload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> StorageResult<PutReceipt> {
        let store = self.store(bucket)?;
        let location = Self::location(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.put(&location, PutPayload::from(data)).await;

        let put = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            map_object_error(e, bucket, key)
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(PutReceipt {
            container: bucket.to_string(),
            key: key.to_string(),
            e_tag: put.e_tag,
        })
    }
}

fn map_object_error(err: ObjectStoreError, bucket: &str, key: &str) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(format!("{}/{}", bucket, key)),
        ObjectStoreError::PermissionDenied { .. } | ObjectStoreError::Unauthenticated { .. } => {
            StorageError::AccessDenied(err.to_string())
        }
        ObjectStoreError::InvalidPath { .. } => StorageError::InvalidKey(err.to_string()),
        other => StorageError::BackendError(other.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    #[tracing::instrument(skip(self), fields(bucket = %container))]
    async fn create_private_container(&self, container: &str) -> StorageResult<ContainerCreation> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(container)
            .acl(BucketCannedAcl::Private);

        // us-east-1 rejects an explicit location constraint.
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %container, "Bucket created");
                Ok(ContainerCreation::Created)
            }
            Err(err) => {
                let already_owned = err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you())
                    .unwrap_or(false);
                if already_owned {
                    tracing::info!(bucket = %container, "Bucket already exists");
                    return Ok(ContainerCreation::AlreadyExists);
                }
                let code = err.code().map(str::to_string);
                tracing::error!(error = %err, bucket = %container, "Bucket creation failed");
                match code.as_deref() {
                    Some("AccessDenied") => Err(StorageError::AccessDenied(err.to_string())),
                    Some("InvalidBucketName") => Err(StorageError::InvalidKey(err.to_string())),
                    _ => Err(StorageError::BackendError(err.to_string())),
                }
            }
        }
    }

    async fn list_containers(&self) -> StorageResult<Vec<String>> {
        let output = self.client.list_buckets().send().await.map_err(|e| {
            tracing::error!(error = %e, "Listing buckets failed");
            StorageError::BackendError(e.to_string())
        })?;

        let mut names: Vec<String> = output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_contents(&self, container: &str) -> StorageResult<ObjectStream> {
        let store = self.store(container)?;
        let bucket = container.to_string();

        let stream = store.list(None).map(move |item| {
            item.map(|meta| ObjectInfo {
                key: meta.location.to_string(),
                size: meta.size,
                e_tag: meta.e_tag,
            })
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::ContainerNotFound(bucket.clone()),
                other => map_object_error(other, &bucket, ""),
            })
        });

        Ok(Box::pin(stream))
    }

    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Bytes> {
        let store = self.store(container)?;
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.get(&location).await;
        let data = result
            .map_err(|e| map_object_error(e, container, key))?
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %container,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        local_path: &std::path::Path,
    ) -> StorageResult<PutReceipt> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read {}: {}",
                local_path.display(),
                e
            ))
        })?;
        self.put_payload(container, key, Bytes::from(data)).await
    }

    async fn put_bytes(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
    ) -> StorageResult<PutReceipt> {
        self.put_payload(container, key, data).await
    }

    async fn exists(&self, container: &str, key: &str) -> StorageResult<bool> {
        let store = self.store(container)?;
        let location = Self::location(key)?;
        match store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_object_error(e, container, key)),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
