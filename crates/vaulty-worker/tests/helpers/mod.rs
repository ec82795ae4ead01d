//! In-memory collaborators for workflow tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use vaulty_core::models::{
    ArchiveReceipt, ItemReport, JobKind, JobSummary, QueueRef, SourceItem, SourcePage, TopicRef,
    VaultSummary,
};
use vaulty_core::{ItemError, ProgressReporter};
use vaulty_services::{ArchiveService, ContentProvider, NotificationService, QueueMessage};
use vaulty_worker::TransferDestination;

/// Queue body as delivered through the topic.
pub fn envelope(job_id: &str, status: &str) -> String {
    let inner = serde_json::json!({
        "Action": "InventoryRetrieval",
        "JobId": job_id,
        "StatusCode": status,
        "StatusMessage": if status == "Failed" { "retrieval failed" } else { "Succeeded" },
        "Completed": true,
        "VaultARN": "arn:aws:glacier:eu-west-1:123:vaults/videos_openhpi",
    })
    .to_string();
    serde_json::json!({ "Type": "Notification", "Message": inner }).to_string()
}

pub fn message(body: impl Into<String>, receipt: &str) -> QueueMessage {
    QueueMessage {
        body: body.into(),
        receipt_handle: receipt.to_string(),
    }
}

pub fn inventory_json(archive_ids: &[&str]) -> Bytes {
    let list: Vec<serde_json::Value> = archive_ids
        .iter()
        .map(|id| serde_json::json!({ "ArchiveId": id, "ArchiveDescription": format!("/videos/{}", id), "Size": 1 }))
        .collect();
    Bytes::from(
        serde_json::json!({
            "VaultARN": "arn:aws:glacier:eu-west-1:123:vaults/videos_openhpi",
            "InventoryDate": "2026-10-01T00:00:00Z",
            "ArchiveList": list,
        })
        .to_string(),
    )
}

#[derive(Default)]
pub struct FakeArchive {
    pub vaults: Mutex<Vec<String>>,
    pub created: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<(String, String)>>,
    pub next_job_id: Mutex<String>,
    pub job_output: Mutex<Bytes>,
    pub deleted: Mutex<Vec<String>>,
    pub delete_failures: Mutex<HashSet<String>>,
    pub already_deleted: Mutex<HashSet<String>>,
    pub attached: Mutex<Vec<(String, String)>>,
    pub detached: Mutex<Vec<String>>,
    pub fail_attach: Mutex<bool>,
    pub uploads: Mutex<Vec<String>>,
}

impl FakeArchive {
    pub fn with_job(job_id: &str, output: Bytes) -> Self {
        let archive = Self::default();
        *archive.next_job_id.lock().unwrap() = job_id.to_string();
        *archive.job_output.lock().unwrap() = output;
        archive
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveService for FakeArchive {
    async fn create_container(&self, container: &str) -> Result<()> {
        self.created.lock().unwrap().push(container.to_string());
        self.vaults.lock().unwrap().push(container.to_string());
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<VaultSummary>> {
        Ok(self
            .vaults
            .lock()
            .unwrap()
            .iter()
            .map(|name| VaultSummary {
                vault_name: name.clone(),
                vault_arn: None,
                creation_date: None,
                number_of_archives: 0,
                size_in_bytes: 0,
            })
            .collect())
    }

    async fn submit_retrieval_job(
        &self,
        container: &str,
        _kind: JobKind,
        _topic: &TopicRef,
    ) -> Result<String> {
        let job_id = self.next_job_id.lock().unwrap().clone();
        self.submitted
            .lock()
            .unwrap()
            .push((container.to_string(), job_id.clone()));
        Ok(job_id)
    }

    async fn get_job_output(&self, _container: &str, _job_id: &str) -> Result<Bytes> {
        Ok(self.job_output.lock().unwrap().clone())
    }

    async fn delete_item(&self, _container: &str, item_id: &str) -> Result<(), ItemError> {
        if self.delete_failures.lock().unwrap().contains(item_id) {
            return Err(ItemError::Transient(format!("connection reset deleting {}", item_id)));
        }
        if self.already_deleted.lock().unwrap().contains(item_id) {
            return Err(ItemError::AlreadyGone(format!("archive {} not found", item_id)));
        }
        self.deleted.lock().unwrap().push(item_id.to_string());
        Ok(())
    }

    async fn attach_notification_target(&self, container: &str, topic: &TopicRef) -> Result<()> {
        if *self.fail_attach.lock().unwrap() {
            return Err(anyhow!("vault not found"));
        }
        self.attached
            .lock()
            .unwrap()
            .push((container.to_string(), topic.arn.clone()));
        Ok(())
    }

    async fn detach_notification_target(&self, container: &str) -> Result<()> {
        self.detached.lock().unwrap().push(container.to_string());
        Ok(())
    }

    async fn list_jobs(&self, _container: &str) -> Result<Vec<JobSummary>> {
        Ok(Vec::new())
    }

    async fn upload(
        &self,
        _container: &str,
        description: &str,
        _payload: Bytes,
    ) -> Result<ArchiveReceipt, ItemError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(description.to_string());
        Ok(ArchiveReceipt {
            archive_id: format!("archive-{}", uploads.len()),
            checksum: None,
            location: None,
        })
    }
}

/// Which notification setup call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    CreateTopic,
    CreateQueue,
    AuthorizePublish,
    Subscribe,
}

#[derive(Default)]
pub struct FakeNotifier {
    pub batches: Mutex<VecDeque<Vec<QueueMessage>>>,
    pub acknowledged: Mutex<Vec<String>>,
    pub receive_calls: Mutex<usize>,
    pub fail_at: Mutex<Option<FailAt>>,
    pub fail_receive: Mutex<bool>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeNotifier {
    pub fn with_batches(batches: Vec<Vec<QueueMessage>>) -> Self {
        let notifier = Self::default();
        *notifier.batches.lock().unwrap() = batches.into();
        notifier
    }

    pub fn failing_at(step: FailAt) -> Self {
        let notifier = Self::default();
        *notifier.fail_at.lock().unwrap() = Some(step);
        notifier
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    fn check(&self, step: FailAt) -> Result<()> {
        if *self.fail_at.lock().unwrap() == Some(step) {
            Err(anyhow!("{:?} refused", step))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationService for FakeNotifier {
    async fn create_topic(&self, name: &str) -> Result<TopicRef> {
        self.check(FailAt::CreateTopic)?;
        Ok(TopicRef {
            arn: format!("arn:aws:sns:eu-west-1:123:{}", name),
        })
    }

    async fn create_queue(&self, name: &str) -> Result<QueueRef> {
        self.check(FailAt::CreateQueue)?;
        Ok(QueueRef {
            url: format!("https://sqs.eu-west-1.amazonaws.com/123/{}", name),
            arn: format!("arn:aws:sqs:eu-west-1:123:{}", name),
        })
    }

    async fn authorize_publish(&self, _queue: &QueueRef, _topic: &TopicRef) -> Result<()> {
        self.check(FailAt::AuthorizePublish)
    }

    async fn subscribe(&self, topic: &TopicRef, _queue: &QueueRef) -> Result<String> {
        self.check(FailAt::Subscribe)?;
        Ok(format!("{}:sub-1", topic.arn))
    }

    async fn receive(&self, _queue: &QueueRef, _wait_secs: i32) -> Result<Vec<QueueMessage>> {
        *self.receive_calls.lock().unwrap() += 1;
        if *self.fail_receive.lock().unwrap() {
            return Err(anyhow!("queue does not exist"));
        }
        let batch = self.batches.lock().unwrap().pop_front();
        if batch.is_none() {
            tokio::task::yield_now().await;
        }
        Ok(batch.unwrap_or_default())
    }

    async fn acknowledge(&self, _queue: &QueueRef, receipt_handle: &str) -> Result<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, subscription: &str) -> Result<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("subscription:{}", subscription));
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueRef) -> Result<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("queue:{}", queue.url));
        Ok(())
    }

    async fn delete_topic(&self, topic: &TopicRef) -> Result<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("topic:{}", topic.arn));
        Ok(())
    }
}

/// Provider serving fixed pages; page `n` is `pages[n - 1]`.
#[derive(Default)]
pub struct FakeProvider {
    pub pages: Vec<Vec<SourceItem>>,
    pub failing_downloads: HashSet<String>,
    pub failing_page: Option<u32>,
    pub pages_requested: Mutex<Vec<u32>>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(pages: Vec<Vec<SourceItem>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn videos(ids: &[&str]) -> Vec<SourceItem> {
        ids.iter()
            .map(|id| SourceItem::new(format!("/videos/{}", id)).with_location(format!("https://cdn/{}.mp4", id)))
            .collect()
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.pages_requested.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_page(&self, page: u32, _per_page: u32) -> Result<SourcePage> {
        self.pages_requested.lock().unwrap().push(page);
        if self.failing_page == Some(page) {
            return Err(anyhow!("listing returned 500"));
        }
        let index = page as usize - 1;
        Ok(SourcePage {
            items: self.pages.get(index).cloned().unwrap_or_default(),
            has_more: index + 1 < self.pages.len(),
        })
    }

    async fn download(&self, item: &SourceItem) -> Result<Bytes, ItemError> {
        self.downloads.lock().unwrap().push(item.id.clone());
        if self.failing_downloads.contains(&item.id) {
            return Err(ItemError::Transient(format!("download of {} timed out", item.id)));
        }
        Ok(Bytes::from(format!("payload of {}", item.id)))
    }
}

/// Destination that remembers every upload.
#[derive(Default)]
pub struct RecordingDestination {
    pub uploads: Mutex<Vec<(String, String)>>,
}

impl RecordingDestination {
    pub fn uploaded_ids(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait]
impl TransferDestination for RecordingDestination {
    fn container(&self) -> &str {
        "recording"
    }

    async fn upload(
        &self,
        key: &str,
        item: &SourceItem,
        payload: Bytes,
    ) -> Result<serde_json::Value, ItemError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((key.to_string(), item.id.clone()));
        Ok(serde_json::json!({
            "archive_id": format!("archive-{}", uploads.len()),
            "size": payload.len(),
        }))
    }
}

/// Reporter that keeps every item report.
#[derive(Default)]
pub struct CollectingReporter {
    pub reports: Mutex<Vec<ItemReport>>,
    pub per_action: Mutex<HashMap<String, usize>>,
}

impl CollectingReporter {
    pub fn reports(&self) -> Vec<ItemReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn item_finished(&self, action: &str, _container: &str, report: &ItemReport) {
        *self
            .per_action
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default() += 1;
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Reporter that cancels `token` once `after` items have finished.
pub struct CancelAfter {
    pub after: usize,
    pub token: vaulty_worker::CancellationToken,
    pub finished: Mutex<usize>,
}

impl CancelAfter {
    pub fn new(after: usize, token: vaulty_worker::CancellationToken) -> Self {
        Self {
            after,
            token,
            finished: Mutex::new(0),
        }
    }
}

impl ProgressReporter for CancelAfter {
    fn item_finished(&self, _action: &str, _container: &str, _report: &ItemReport) {
        let mut finished = self.finished.lock().unwrap();
        *finished += 1;
        if *finished == self.after {
            self.token.cancel();
        }
    }
}
