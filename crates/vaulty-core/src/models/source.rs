use serde::{Deserialize, Serialize};

use crate::keys::ledger_key;

/// One item listed by an upstream content provider (a video or a bucket object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Natural identifier: provider URI for videos, object key for bucket objects.
    pub id: String,
    pub name: Option<String>,
    /// Where the payload is fetched from (download link or object key).
    pub location: Option<String>,
    pub size: Option<u64>,
}

impl SourceItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            location: None,
            size: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Ledger key of this item; stable across page fetches and runs.
    pub fn ledger_key(&self) -> String {
        ledger_key(&self.id)
    }
}

/// One page of a provider listing.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub items: Vec<SourceItem>,
    pub has_more: bool,
}
