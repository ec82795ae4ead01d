//! Publish/subscribe topic and queue abstraction used to wait for archive jobs.

#[cfg(feature = "aws")]
pub mod sns_sqs;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use vaulty_core::models::{QueueRef, TopicRef};

#[cfg(feature = "aws")]
pub use sns_sqs::SnsSqsNotifier;

/// Queue names are limited to 80 characters.
const MAX_CHANNEL_NAME_LEN: usize = 80;
const CHANNEL_PREFIX: &str = "vaulty-";

/// A message received from a queue, not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: String,
    pub receipt_handle: String,
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Create a topic, or return the existing one with the same name.
    async fn create_topic(&self, name: &str) -> Result<TopicRef>;

    /// Create a queue, or return the existing one with the same name.
    async fn create_queue(&self, name: &str) -> Result<QueueRef>;

    /// Allow `topic` to deliver messages into `queue`.
    async fn authorize_publish(&self, queue: &QueueRef, topic: &TopicRef) -> Result<()>;

    /// Subscribe `queue` to `topic`, returning the subscription identifier.
    async fn subscribe(&self, topic: &TopicRef, queue: &QueueRef) -> Result<String>;

    /// Long-poll the queue for up to `wait_secs` seconds.
    async fn receive(&self, queue: &QueueRef, wait_secs: i32) -> Result<Vec<QueueMessage>>;

    /// Remove a received message from the queue.
    async fn acknowledge(&self, queue: &QueueRef, receipt_handle: &str) -> Result<()>;

    async fn unsubscribe(&self, subscription: &str) -> Result<()>;

    async fn delete_queue(&self, queue: &QueueRef) -> Result<()>;

    async fn delete_topic(&self, topic: &TopicRef) -> Result<()>;
}

/// Topic and queue name for a container: `vaulty-<container>` with every character outside
/// `[A-Za-z0-9_-]` replaced by `-`, cut to the queue name limit.
///
/// The name is stable, so re-runs against the same container reuse the same topic.
pub fn channel_name(container: &str) -> String {
    let sanitized: String = container
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let mut name = format!("{}{}", CHANNEL_PREFIX, sanitized);
    name.truncate(MAX_CHANNEL_NAME_LEN);
    name
}

/// Queue access policy letting only `topic_arn` send messages to `queue_arn`.
pub fn publish_policy(queue_arn: &str, topic_arn: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Id": format!("{}/SQSDefaultPolicy", queue_arn),
        "Statement": [{
            "Sid": "AllowTopicPublish",
            "Effect": "Allow",
            "Principal": { "Service": "sns.amazonaws.com" },
            "Action": "sqs:SendMessage",
            "Resource": queue_arn,
            "Condition": { "ArnEquals": { "aws:SourceArn": topic_arn } }
        }]
    })
    .to_string()
}
