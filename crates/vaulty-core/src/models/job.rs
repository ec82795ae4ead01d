use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Coordinator state for one outstanding archive job.
///
/// `NotificationReceived` is the only successful terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Uninitialized,
    TopicReady,
    QueueSubscribed,
    JobSubmitted,
    AwaitingNotification,
    NotificationReceived,
    SetupFailed,
    ListenTimeout,
    ListenFailed,
    JobFailed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::NotificationReceived
                | JobState::SetupFailed
                | JobState::ListenTimeout
                | JobState::ListenFailed
                | JobState::JobFailed
                | JobState::Cancelled
        )
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            JobState::Uninitialized => "UNINITIALIZED",
            JobState::TopicReady => "TOPIC_READY",
            JobState::QueueSubscribed => "QUEUE_SUBSCRIBED",
            JobState::JobSubmitted => "JOB_SUBMITTED",
            JobState::AwaitingNotification => "AWAITING_NOTIFICATION",
            JobState::NotificationReceived => "NOTIFICATION_RECEIVED",
            JobState::SetupFailed => "SETUP_FAILED",
            JobState::ListenTimeout => "LISTEN_TIMEOUT",
            JobState::ListenFailed => "LISTEN_FAILED",
            JobState::JobFailed => "JOB_FAILED",
            JobState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Kind of archive job a coordinator submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "inventory-retrieval")]
    InventoryRetrieval,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::InventoryRetrieval => "inventory-retrieval",
        }
    }
}

/// Handles to the topic a vault publishes job completions to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    pub arn: String,
}

/// Handles to the queue subscribed to a [`TopicRef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRef {
    pub url: String,
    pub arn: String,
}

/// One outstanding long-running archive operation.
#[derive(Debug, Clone, Serialize)]
pub struct JobDescriptor {
    pub target_container: String,
    pub kind: JobKind,
    pub notification_topic: Option<TopicRef>,
    pub notification_queue: Option<QueueRef>,
    pub subscription: Option<String>,
    pub job_id: Option<String>,
    pub state: JobState,
}

impl JobDescriptor {
    pub fn new(target_container: impl Into<String>, kind: JobKind) -> Self {
        Self {
            target_container: target_container.into(),
            kind,
            notification_topic: None,
            notification_queue: None,
            subscription: None,
            job_id: None,
            state: JobState::Uninitialized,
        }
    }

    /// Whether a notification belongs to this job. Before submission nothing matches.
    pub fn matches(&self, notification: &JobNotification) -> bool {
        self.job_id
            .as_deref()
            .is_some_and(|id| id == notification.job_id)
    }
}

/// Job completion notification published by the archive service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobNotification {
    pub job_id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(rename = "VaultARN", default)]
    pub vault_arn: Option<String>,
}

/// Envelope the pub/sub topic wraps around a published message when delivering to a queue.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TopicEnvelope {
    message: String,
}

impl JobNotification {
    /// Parse a queue message body.
    ///
    /// Bodies are normally topic envelopes whose `Message` field holds the notification as a
    /// JSON string; raw delivery (the notification itself) is accepted too.
    pub fn from_queue_body(body: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<TopicEnvelope>(body) {
            Ok(envelope) => serde_json::from_str(&envelope.message),
            Err(_) => serde_json::from_str(body),
        }
    }

    /// Whether the archive reported the job as failed.
    pub fn is_failure(&self) -> bool {
        self.status_code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case("Failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: &str = r#"{"Action":"InventoryRetrieval","JobId":"job-b","StatusCode":"Succeeded","Completed":true,"VaultARN":"arn:aws:glacier:eu-west-1:1:vaults/v"}"#;

    #[test]
    fn parses_topic_envelope() {
        let body = serde_json::json!({
            "Type": "Notification",
            "MessageId": "m-1",
            "TopicArn": "arn:aws:sns:eu-west-1:1:vaulty-v",
            "Message": INNER,
        })
        .to_string();
        let n = JobNotification::from_queue_body(&body).unwrap();
        assert_eq!(n.job_id, "job-b");
        assert_eq!(n.completed, Some(true));
        assert!(!n.is_failure());
    }

    #[test]
    fn parses_raw_delivery() {
        let n = JobNotification::from_queue_body(INNER).unwrap();
        assert_eq!(n.job_id, "job-b");
        assert_eq!(n.action.as_deref(), Some("InventoryRetrieval"));
    }

    #[test]
    fn rejects_body_without_job_id() {
        assert!(JobNotification::from_queue_body(r#"{"hello":"world"}"#).is_err());
        assert!(JobNotification::from_queue_body("not json").is_err());
    }

    #[test]
    fn failed_status_detected() {
        let n = JobNotification::from_queue_body(
            r#"{"JobId":"j","StatusCode":"Failed","StatusMessage":"boom"}"#,
        )
        .unwrap();
        assert!(n.is_failure());
    }

    #[test]
    fn descriptor_matches_only_its_job() {
        let mut job = JobDescriptor::new("v", JobKind::InventoryRetrieval);
        let n = JobNotification::from_queue_body(INNER).unwrap();
        assert!(!job.matches(&n), "nothing matches before submission");
        job.job_id = Some("job-a".to_string());
        assert!(!job.matches(&n));
        job.job_id = Some("job-b".to_string());
        assert!(job.matches(&n));
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::NotificationReceived.is_terminal());
        assert!(JobState::ListenTimeout.is_terminal());
        assert!(JobState::SetupFailed.is_terminal());
        assert!(!JobState::AwaitingNotification.is_terminal());
        assert_eq!(JobState::ListenTimeout.to_string(), "LISTEN_TIMEOUT");
    }
}
