use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::types::QueueAttributeName;
use vaulty_core::models::{QueueRef, TopicRef};

use super::{publish_policy, NotificationService, QueueMessage};

/// Receive at most this many messages per call (service maximum).
const MAX_MESSAGES_PER_RECEIVE: i32 = 10;

/// Notification channel built from an SNS topic and an SQS queue.
#[derive(Clone)]
pub struct SnsSqsNotifier {
    sns: aws_sdk_sns::Client,
    sqs: aws_sdk_sqs::Client,
}

impl SnsSqsNotifier {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            sns: aws_sdk_sns::Client::new(config),
            sqs: aws_sdk_sqs::Client::new(config),
        }
    }

    async fn queue_arn(&self, queue_url: &str) -> Result<String> {
        let output = self
            .sqs
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .with_context(|| format!("Failed to read attributes of queue {}", queue_url))?;

        output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::QueueArn))
            .cloned()
            .with_context(|| format!("Queue {} has no QueueArn attribute", queue_url))
    }
}

#[async_trait]
impl NotificationService for SnsSqsNotifier {
    #[tracing::instrument(skip(self), fields(aws.service.name = "sns"))]
    async fn create_topic(&self, name: &str) -> Result<TopicRef> {
        let output = self
            .sns
            .create_topic()
            .name(name)
            .send()
            .await
            .with_context(|| format!("Failed to create topic {}", name))?;

        let arn = output
            .topic_arn()
            .map(str::to_string)
            .context("Create topic response carried no topic ARN")?;

        tracing::info!(topic = %arn, "Topic ready");
        Ok(TopicRef { arn })
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "sqs"))]
    async fn create_queue(&self, name: &str) -> Result<QueueRef> {
        let output = self
            .sqs
            .create_queue()
            .queue_name(name)
            .attributes(QueueAttributeName::DelaySeconds, "0")
            .send()
            .await
            .with_context(|| format!("Failed to create queue {}", name))?;

        let url = output
            .queue_url()
            .map(str::to_string)
            .context("Create queue response carried no queue URL")?;
        let arn = self.queue_arn(&url).await?;

        tracing::info!(queue = %url, "Queue ready");
        Ok(QueueRef { url, arn })
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "sqs", queue = %queue.url, topic = %topic.arn))]
    async fn authorize_publish(&self, queue: &QueueRef, topic: &TopicRef) -> Result<()> {
        self.sqs
            .set_queue_attributes()
            .queue_url(&queue.url)
            .attributes(
                QueueAttributeName::Policy,
                publish_policy(&queue.arn, &topic.arn),
            )
            .send()
            .await
            .with_context(|| format!("Failed to set access policy on queue {}", queue.url))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "sns", queue = %queue.arn, topic = %topic.arn))]
    async fn subscribe(&self, topic: &TopicRef, queue: &QueueRef) -> Result<String> {
        let output = self
            .sns
            .subscribe()
            .topic_arn(&topic.arn)
            .protocol("sqs")
            .endpoint(&queue.arn)
            .return_subscription_arn(true)
            .send()
            .await
            .context("Failed to subscribe queue to topic")?;

        output
            .subscription_arn()
            .map(str::to_string)
            .context("Subscribe response carried no subscription ARN")
    }

    async fn receive(&self, queue: &QueueRef, wait_secs: i32) -> Result<Vec<QueueMessage>> {
        let output = self
            .sqs
            .receive_message()
            .queue_url(&queue.url)
            .max_number_of_messages(MAX_MESSAGES_PER_RECEIVE)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .with_context(|| format!("Failed to receive from queue {}", queue.url))?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| match (m.body(), m.receipt_handle()) {
                (Some(body), Some(handle)) => Some(QueueMessage {
                    body: body.to_string(),
                    receipt_handle: handle.to_string(),
                }),
                _ => {
                    tracing::debug!(message_id = ?m.message_id(), "Skipping message without body or receipt handle");
                    None
                }
            })
            .collect();

        Ok(messages)
    }

    async fn acknowledge(&self, queue: &QueueRef, receipt_handle: &str) -> Result<()> {
        self.sqs
            .delete_message()
            .queue_url(&queue.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .context("Failed to delete message from queue")?;
        Ok(())
    }

    async fn unsubscribe(&self, subscription: &str) -> Result<()> {
        self.sns
            .unsubscribe()
            .subscription_arn(subscription)
            .send()
            .await
            .with_context(|| format!("Failed to remove subscription {}", subscription))?;
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueRef) -> Result<()> {
        self.sqs
            .delete_queue()
            .queue_url(&queue.url)
            .send()
            .await
            .with_context(|| format!("Failed to delete queue {}", queue.url))?;
        Ok(())
    }

    async fn delete_topic(&self, topic: &TopicRef) -> Result<()> {
        self.sns
            .delete_topic()
            .topic_arn(&topic.arn)
            .send()
            .await
            .with_context(|| format!("Failed to delete topic {}", topic.arn))?;
        Ok(())
    }
}
