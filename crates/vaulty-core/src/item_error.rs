//! Per-item error types
//!
//! Errors raised while transferring, deleting or cataloguing a single item. They never
//! abort a workflow: the runner catches them at item granularity, logs them and moves on.
//! The variants let callers target retries: a transient failure is worth re-running, a
//! permanent rejection is not, and an item that is already gone needs no further work.

use std::fmt;

/// Coarse classification of an [`ItemError`], stable for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    AlreadyGone,
    Transient,
    Unauthorized,
    QuotaExceeded,
    InvalidPayload,
    Rejected,
}

impl fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemErrorKind::AlreadyGone => "already_gone",
            ItemErrorKind::Transient => "transient",
            ItemErrorKind::Unauthorized => "unauthorized",
            ItemErrorKind::QuotaExceeded => "quota_exceeded",
            ItemErrorKind::InvalidPayload => "invalid_payload",
            ItemErrorKind::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Item-level failure
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    /// The item no longer exists at the destination (e.g. archive already deleted).
    #[error("Item already gone: {0}")]
    AlreadyGone(String),

    /// Network failure, timeout or temporary service unavailability.
    #[error("Transient service error: {0}")]
    Transient(String),

    /// Credentials rejected or permission missing.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Throttling or account limits.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The payload or parameters were refused as invalid.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Any other permanent refusal.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ItemError {
    pub fn kind(&self) -> ItemErrorKind {
        match self {
            ItemError::AlreadyGone(_) => ItemErrorKind::AlreadyGone,
            ItemError::Transient(_) => ItemErrorKind::Transient,
            ItemError::Unauthorized(_) => ItemErrorKind::Unauthorized,
            ItemError::QuotaExceeded(_) => ItemErrorKind::QuotaExceeded,
            ItemError::InvalidPayload(_) => ItemErrorKind::InvalidPayload,
            ItemError::Rejected(_) => ItemErrorKind::Rejected,
        }
    }

    /// Whether re-running the item later can succeed.
    ///
    /// Quota errors are recoverable: throttling clears with time.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ItemError::Transient(_) | ItemError::QuotaExceeded(_)
        )
    }

    /// Classify an AWS-style service error code.
    ///
    /// `not_found_means_gone` is set by delete operations, where a missing resource means
    /// the work is already done. Everywhere else a missing resource is a rejection.
    pub fn from_service_code(code: Option<&str>, message: String, not_found_means_gone: bool) -> Self {
        match code {
            Some("ResourceNotFoundException") | Some("NoSuchKey") | Some("NotFound")
                if not_found_means_gone =>
            {
                ItemError::AlreadyGone(message)
            }
            Some("ThrottlingException")
            | Some("Throttling")
            | Some("LimitExceededException")
            | Some("PolicyEnforcedException")
            | Some("SlowDown") => ItemError::QuotaExceeded(message),
            Some("InvalidParameterValueException")
            | Some("MissingParameterValueException")
            | Some("RequestTimeoutException")
            | Some("InvalidArgument") => ItemError::InvalidPayload(message),
            Some("AccessDeniedException")
            | Some("AccessDenied")
            | Some("UnrecognizedClientException")
            | Some("InvalidSignatureException")
            | Some("ExpiredTokenException") => ItemError::Unauthorized(message),
            Some("ServiceUnavailableException")
            | Some("InternalFailure")
            | Some("InternalError")
            | Some("ServiceUnavailable") => ItemError::Transient(message),
            _ => ItemError::Rejected(message),
        }
    }

    /// Classify an HTTP status code returned by a content provider.
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ItemError::Unauthorized(message),
            408 | 500..=599 => ItemError::Transient(message),
            429 => ItemError::QuotaExceeded(message),
            400 | 413 | 422 => ItemError::InvalidPayload(message),
            _ => ItemError::Rejected(message),
        }
    }
}

/// Extension trait to mark arbitrary results as transient item failures.
pub trait ItemResultExt<T> {
    fn transient(self) -> Result<T, ItemError>;
}

impl<T, E: fmt::Display> ItemResultExt<T> for Result<T, E> {
    fn transient(self) -> Result<T, ItemError> {
        self.map_err(|e| ItemError::Transient(e.to_string()))
    }
}
