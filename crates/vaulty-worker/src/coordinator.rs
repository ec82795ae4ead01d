//! Notification-driven job coordination.
//!
//! The coordinator never polls a job's status. It wires the vault's completion events to a
//! topic, subscribes a queue to that topic, submits the job and then blocks on the queue
//! until the notification for its job id arrives:
//!
//! ```text
//! UNINITIALIZED -> TOPIC_READY -> QUEUE_SUBSCRIBED -> JOB_SUBMITTED
//!   -> AWAITING_NOTIFICATION -> NOTIFICATION_RECEIVED
//! ```
//!
//! Every failure before submission is a `SETUP_FAILED` naming the step, and no job is
//! submitted after one. The wait ends in `LISTEN_TIMEOUT` when the configured limit passes,
//! in `CANCELLED` when the cancellation token fires, and in `JOB_FAILED` when the matching
//! notification reports a failed job.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vaulty_core::models::{JobDescriptor, JobKind, JobNotification, JobState, QueueRef, TopicRef};
use vaulty_core::{SetupStep, VaultyConfig, WorkflowError};
use vaulty_services::{channel_name, ArchiveService, NotificationService, QueueMessage};

/// Invoked with the output of a job once its completion notification arrived.
#[async_trait]
pub trait JobHandler: Send + Sync {
    type Output: Send;

    async fn handle(&self, job: &JobDescriptor, output: Bytes) -> Result<Self::Output, WorkflowError>;
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on the notification wait. `None` waits indefinitely.
    pub listen_timeout: Option<Duration>,
    /// Long-poll duration of one queue receive, in seconds.
    pub receive_wait_secs: i32,
    /// Remove subscription, queue, topic and vault notifications once the job ends.
    pub cleanup: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_timeout: None,
            receive_wait_secs: 20,
            cleanup: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_config(config: &VaultyConfig) -> Self {
        Self {
            listen_timeout: config.listen_timeout,
            receive_wait_secs: config.receive_wait_secs,
            cleanup: config.cleanup_notifications,
        }
    }
}

/// Result of a coordinated job: the final descriptor and the handler's output.
#[derive(Debug)]
pub struct CoordinatedJob<T> {
    pub descriptor: JobDescriptor,
    pub output: T,
}

/// Topic, queue and subscription created for one job.
#[derive(Debug, Default, Clone)]
pub struct NotificationChannel {
    pub topic: Option<TopicRef>,
    pub queue: Option<QueueRef>,
    pub subscription: Option<String>,
    /// Vault whose notifications point at `topic`.
    pub attached_to: Option<String>,
}

impl NotificationChannel {
    /// Tear down whatever was created, newest first. Failures are logged, never raised:
    /// the job outcome is already decided when this runs.
    pub async fn release(self, archive: &dyn ArchiveService, notifier: &dyn NotificationService) {
        if let Some(subscription) = &self.subscription {
            if let Err(e) = notifier.unsubscribe(subscription).await {
                tracing::warn!(error = %e, subscription = %subscription, "Failed to remove subscription");
            }
        }
        if let Some(queue) = &self.queue {
            if let Err(e) = notifier.delete_queue(queue).await {
                tracing::warn!(error = %e, queue = %queue.url, "Failed to delete queue");
            }
        }
        if let Some(vault) = &self.attached_to {
            if let Err(e) = archive.detach_notification_target(vault).await {
                tracing::warn!(error = %e, vault = %vault, "Failed to remove vault notifications");
            }
        }
        if let Some(topic) = &self.topic {
            if let Err(e) = notifier.delete_topic(topic).await {
                tracing::warn!(error = %e, topic = %topic.arn, "Failed to delete topic");
            }
        }
        tracing::info!("Notification channel released");
    }
}

pub struct NotificationCoordinator<'a> {
    archive: &'a dyn ArchiveService,
    notifier: &'a dyn NotificationService,
    config: CoordinatorConfig,
    cancel: CancellationToken,
}

impl<'a> NotificationCoordinator<'a> {
    pub fn new(
        archive: &'a dyn ArchiveService,
        notifier: &'a dyn NotificationService,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            archive,
            notifier,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to abort a pending wait from outside (e.g. on Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Submit a `kind` job against `container` and hand its output to `handler` once the
    /// completion notification arrives.
    #[tracing::instrument(skip(self, handler), fields(vault = %container, job.kind = kind.as_str()))]
    pub async fn run<H: JobHandler>(
        &self,
        container: &str,
        kind: JobKind,
        handler: &H,
    ) -> Result<CoordinatedJob<H::Output>, WorkflowError> {
        let mut job = JobDescriptor::new(container, kind);
        let mut channel = NotificationChannel::default();

        let result = self.drive(&mut job, &mut channel, None, handler).await;
        self.finish(job, channel, result).await
    }

    /// Attach to a job that was already submitted and wait for its notification.
    ///
    /// The notification chain is set up the same way as for [`run`](Self::run). A job that
    /// completed before the queue was subscribed is not announced again, so the wait only
    /// ends through the timeout or cancellation in that case.
    #[tracing::instrument(skip(self, container, job_id, handler), fields(vault = %container, job_id = %job_id))]
    pub async fn await_job<H: JobHandler>(
        &self,
        container: &str,
        job_id: &str,
        handler: &H,
    ) -> Result<CoordinatedJob<H::Output>, WorkflowError> {
        let mut job = JobDescriptor::new(container, JobKind::InventoryRetrieval);
        let mut channel = NotificationChannel::default();

        let result = self
            .drive(&mut job, &mut channel, Some(job_id), handler)
            .await;
        self.finish(job, channel, result).await
    }

    async fn finish<T>(
        &self,
        mut job: JobDescriptor,
        channel: NotificationChannel,
        result: Result<T, WorkflowError>,
    ) -> Result<CoordinatedJob<T>, WorkflowError> {
        if let Err(e) = &result {
            if let Some(state) = e.state() {
                job.state = state;
            }
        }

        if job.state.is_terminal() {
            tracing::info!(
                vault = %job.target_container,
                job_id = ?job.job_id,
                state = %job.state,
                "Job coordination ended"
            );
        } else {
            tracing::warn!(
                vault = %job.target_container,
                job_id = ?job.job_id,
                state = %job.state,
                "Job coordination stopped before a terminal state"
            );
        }

        if self.config.cleanup {
            channel.release(self.archive, self.notifier).await;
        }

        result.map(|output| CoordinatedJob {
            descriptor: job,
            output,
        })
    }

    async fn drive<H: JobHandler>(
        &self,
        job: &mut JobDescriptor,
        channel: &mut NotificationChannel,
        existing_job: Option<&str>,
        handler: &H,
    ) -> Result<H::Output, WorkflowError> {
        self.prepare_channel(job, channel).await?;

        let job_id = match existing_job {
            Some(id) => id.to_string(),
            None => {
                let topic = channel
                    .topic
                    .as_ref()
                    .ok_or_else(|| WorkflowError::Config("notification topic missing".to_string()))?;
                self.archive
                    .submit_retrieval_job(&job.target_container, job.kind, topic)
                    .await
                    .map_err(|source| WorkflowError::JobSubmission {
                        container: job.target_container.clone(),
                        source,
                    })?
            }
        };
        job.job_id = Some(job_id.clone());
        self.transition(job, JobState::JobSubmitted);

        let queue = channel
            .queue
            .clone()
            .ok_or_else(|| WorkflowError::Config("notification queue missing".to_string()))?;

        self.transition(job, JobState::AwaitingNotification);
        let (notification, receipt_handle) = self.listen(job, &queue).await?;

        if notification.is_failure() {
            self.acknowledge(&queue, &receipt_handle).await;
            return Err(WorkflowError::JobFailed {
                job_id,
                status_code: notification.status_code.unwrap_or_default(),
                message: notification.status_message.unwrap_or_default(),
            });
        }
        self.transition(job, JobState::NotificationReceived);

        let output = self
            .archive
            .get_job_output(&job.target_container, &job_id)
            .await
            .map_err(|source| WorkflowError::JobOutput {
                job_id: job_id.clone(),
                source,
            })?;

        let handled = handler.handle(job, output).await;
        // A handler that failed or never finished leaves the notification queued, so a
        // re-run with the job id can pick it up again.
        match &handled {
            Ok(_) => self.acknowledge(&queue, &receipt_handle).await,
            Err(e) => tracing::warn!(
                job_id = %job_id,
                error = %e,
                "Handler failed, notification left in the queue"
            ),
        }
        handled
    }

    /// Steps 1 and 2: topic, vault notifications, queue, publish permission, subscription.
    async fn prepare_channel(
        &self,
        job: &mut JobDescriptor,
        channel: &mut NotificationChannel,
    ) -> Result<(), WorkflowError> {
        let container = job.target_container.clone();
        let name = channel_name(&container);

        let topic = self
            .notifier
            .create_topic(&name)
            .await
            .map_err(|e| setup_error(SetupStep::CreateTopic, e))?;
        channel.topic = Some(topic.clone());
        job.notification_topic = Some(topic.clone());
        self.transition(job, JobState::TopicReady);

        self.archive
            .attach_notification_target(&container, &topic)
            .await
            .map_err(|e| setup_error(SetupStep::AttachNotifications, e))?;
        channel.attached_to = Some(container.clone());

        let queue = self
            .notifier
            .create_queue(&name)
            .await
            .map_err(|e| setup_error(SetupStep::CreateQueue, e))?;
        channel.queue = Some(queue.clone());
        job.notification_queue = Some(queue.clone());

        self.notifier
            .authorize_publish(&queue, &topic)
            .await
            .map_err(|e| setup_error(SetupStep::AuthorizePublish, e))?;

        let subscription = self
            .notifier
            .subscribe(&topic, &queue)
            .await
            .map_err(|e| setup_error(SetupStep::Subscribe, e))?;
        channel.subscription = Some(subscription.clone());
        job.subscription = Some(subscription);
        self.transition(job, JobState::QueueSubscribed);

        Ok(())
    }

    /// Step 4: receive until the notification for `job` arrives. Other messages are
    /// acknowledged and dropped.
    async fn listen(
        &self,
        job: &JobDescriptor,
        queue: &QueueRef,
    ) -> Result<(JobNotification, String), WorkflowError> {
        let job_id = job.job_id.clone().unwrap_or_default();
        let started = Instant::now();
        // A timeout too large to represent is no deadline at all.
        let deadline = self
            .config
            .listen_timeout
            .and_then(|t| started.checked_add(t));

        loop {
            let wait_secs = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(WorkflowError::ListenTimeout {
                            job_id,
                            waited: started.elapsed(),
                        });
                    }
                    let remaining_secs = remaining.as_secs_f64().ceil() as i32;
                    self.config.receive_wait_secs.min(remaining_secs)
                }
                None => self.config.receive_wait_secs,
            };

            let messages = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(WorkflowError::Cancelled { job_id });
                }
                received = self.notifier.receive(queue, wait_secs) => {
                    received.map_err(WorkflowError::Receive)?
                }
            };

            let mut matched = None;
            for message in messages {
                match self.triage(job, message) {
                    Triage::Match(notification, receipt) if matched.is_none() => {
                        matched = Some((notification, receipt));
                    }
                    Triage::Match(_, receipt) | Triage::Discard(receipt) => {
                        self.acknowledge(queue, &receipt).await;
                    }
                }
            }

            if let Some(found) = matched {
                tracing::info!(
                    job_id = %job_id,
                    waited_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Job notification received"
                );
                return Ok(found);
            }
        }
    }

    fn triage(&self, job: &JobDescriptor, message: QueueMessage) -> Triage {
        match JobNotification::from_queue_body(&message.body) {
            Ok(notification) if job.matches(&notification) => {
                Triage::Match(notification, message.receipt_handle)
            }
            Ok(notification) => {
                tracing::debug!(
                    expected = ?job.job_id,
                    received = %notification.job_id,
                    "Notification for another job discarded"
                );
                Triage::Discard(message.receipt_handle)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Malformed queue message discarded");
                Triage::Discard(message.receipt_handle)
            }
        }
    }

    async fn acknowledge(&self, queue: &QueueRef, receipt_handle: &str) {
        if let Err(e) = self.notifier.acknowledge(queue, receipt_handle).await {
            tracing::warn!(error = %e, queue = %queue.url, "Failed to acknowledge message");
        }
    }

    fn transition(&self, job: &mut JobDescriptor, state: JobState) {
        tracing::debug!(vault = %job.target_container, from = %job.state, to = %state, "Job state changed");
        job.state = state;
    }
}

enum Triage {
    Match(JobNotification, String),
    Discard(String),
}

fn setup_error(step: SetupStep, source: anyhow::Error) -> WorkflowError {
    tracing::error!(step = %step, error = %source, "Notification setup failed");
    WorkflowError::Setup { step, source }
}
