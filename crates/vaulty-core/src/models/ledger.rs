use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One processed item as remembered by a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub key: String,
    /// Opaque upstream identifier (video URI, object key, archive id).
    pub source_reference: String,
    /// Opaque response of the destination service for this item.
    pub remote_result: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn new(
        key: impl Into<String>,
        source_reference: impl Into<String>,
        remote_result: serde_json::Value,
    ) -> Self {
        Self {
            key: key.into(),
            source_reference: source_reference.into(),
            remote_result,
            recorded_at: Utc::now(),
        }
    }

    /// Archive id recorded by an archive upload, if any.
    pub fn archive_id(&self) -> Option<&str> {
        self.remote_result.get("archive_id").and_then(|v| v.as_str())
    }
}
