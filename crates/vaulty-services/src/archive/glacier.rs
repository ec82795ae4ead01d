use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_glacier::primitives::ByteStream;
use aws_sdk_glacier::types::{JobParameters, VaultNotificationConfig};
use aws_sdk_glacier::Client;
use bytes::Bytes;
use vaulty_core::models::{ArchiveReceipt, JobKind, JobSummary, TopicRef, VaultSummary};
use vaulty_core::ItemError;

use super::ArchiveService;
use crate::aws_error::classify_sdk_error;

/// Account id placeholder meaning "the account of the credentials".
const ACCOUNT_ID: &str = "-";

/// Vault events published to the notification topic.
const NOTIFICATION_EVENTS: [&str; 2] = ["InventoryRetrievalCompleted", "ArchiveRetrievalCompleted"];

/// Archive service backed by Amazon S3 Glacier vaults.
#[derive(Clone)]
pub struct GlacierArchive {
    client: Client,
}

impl GlacierArchive {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ArchiveService for GlacierArchive {
    #[tracing::instrument(skip(self), fields(aws.service.name = "glacier", vault = %container))]
    async fn create_container(&self, container: &str) -> Result<()> {
        let output = self
            .client
            .create_vault()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .send()
            .await
            .with_context(|| format!("Failed to create vault {}", container))?;

        tracing::info!(location = ?output.location(), "Vault ready");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "glacier"))]
    async fn list_containers(&self) -> Result<Vec<VaultSummary>> {
        let mut vaults = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_vaults()
                .account_id(ACCOUNT_ID)
                .set_marker(marker.take())
                .send()
                .await
                .context("Failed to list vaults")?;

            vaults.extend(output.vault_list().iter().map(|v| VaultSummary {
                vault_name: v.vault_name().unwrap_or_default().to_string(),
                vault_arn: v.vault_arn().map(str::to_string),
                creation_date: v.creation_date().map(str::to_string),
                number_of_archives: v.number_of_archives(),
                size_in_bytes: v.size_in_bytes(),
            }));

            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(vaults)
    }

    #[tracing::instrument(skip(self, topic), fields(aws.service.name = "glacier", vault = %container, job.kind = kind.as_str()))]
    async fn submit_retrieval_job(
        &self,
        container: &str,
        kind: JobKind,
        topic: &TopicRef,
    ) -> Result<String> {
        let parameters = JobParameters::builder()
            .r#type(kind.as_str())
            .format("JSON")
            .sns_topic(&topic.arn)
            .build();

        let output = self
            .client
            .initiate_job()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .job_parameters(parameters)
            .send()
            .await
            .with_context(|| format!("Failed to initiate {} job", kind.as_str()))?;

        let job_id = output
            .job_id()
            .map(str::to_string)
            .context("Initiate job response carried no job id")?;

        tracing::info!(job_id = %job_id, "Archive job submitted");
        Ok(job_id)
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "glacier", vault = %container))]
    async fn get_job_output(&self, container: &str, job_id: &str) -> Result<Bytes> {
        let start = std::time::Instant::now();
        let output = self
            .client
            .get_job_output()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .job_id(job_id)
            .send()
            .await
            .with_context(|| format!("Failed to get output of job {}", job_id))?;

        let body = output
            .body
            .collect()
            .await
            .context("Failed to read job output body")?
            .into_bytes();

        tracing::info!(
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Job output fetched"
        );
        Ok(body)
    }

    async fn delete_item(&self, container: &str, item_id: &str) -> Result<(), ItemError> {
        self.client
            .delete_archive()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .archive_id(item_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, true))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, topic), fields(aws.service.name = "glacier", vault = %container, topic = %topic.arn))]
    async fn attach_notification_target(&self, container: &str, topic: &TopicRef) -> Result<()> {
        let mut config = VaultNotificationConfig::builder().sns_topic(&topic.arn);
        for event in NOTIFICATION_EVENTS {
            config = config.events(event);
        }

        self.client
            .set_vault_notifications()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .vault_notification_config(config.build())
            .send()
            .await
            .with_context(|| format!("Failed to set notifications on vault {}", container))?;
        Ok(())
    }

    async fn detach_notification_target(&self, container: &str) -> Result<()> {
        self.client
            .delete_vault_notifications()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .send()
            .await
            .with_context(|| format!("Failed to remove notifications from vault {}", container))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "glacier", vault = %container))]
    async fn list_jobs(&self, container: &str) -> Result<Vec<JobSummary>> {
        let mut jobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_jobs()
                .account_id(ACCOUNT_ID)
                .vault_name(container)
                .set_marker(marker.take())
                .send()
                .await
                .with_context(|| format!("Failed to list jobs of vault {}", container))?;

            jobs.extend(output.job_list().iter().map(|j| JobSummary {
                job_id: j.job_id().unwrap_or_default().to_string(),
                action: j.action().map(|a| a.as_str().to_string()),
                status_code: j.status_code().map(|s| s.as_str().to_string()),
                completed: j.completed(),
                creation_date: j.creation_date().map(str::to_string),
                completion_date: j.completion_date().map(str::to_string),
            }));

            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(jobs)
    }

    #[tracing::instrument(skip(self, payload), fields(aws.service.name = "glacier", vault = %container, size_bytes = payload.len()))]
    async fn upload(
        &self,
        container: &str,
        description: &str,
        payload: Bytes,
    ) -> Result<ArchiveReceipt, ItemError> {
        let start = std::time::Instant::now();
        let output = self
            .client
            .upload_archive()
            .account_id(ACCOUNT_ID)
            .vault_name(container)
            .archive_description(description)
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, false))?;

        let archive_id = output
            .archive_id()
            .map(str::to_string)
            .ok_or_else(|| ItemError::Rejected("Upload response carried no archive id".to_string()))?;

        tracing::info!(
            archive_id = %archive_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive uploaded"
        );

        Ok(ArchiveReceipt {
            archive_id,
            checksum: output.checksum().map(str::to_string),
            location: output.location().map(str::to_string),
        })
    }
}
