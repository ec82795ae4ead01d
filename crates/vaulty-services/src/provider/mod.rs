//! Upstream content providers: where the items of an upload run come from.

pub mod bucket;
#[cfg(feature = "vimeo")]
pub mod vimeo;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use vaulty_core::models::{SourceItem, SourcePage};
use vaulty_core::ItemError;

pub use bucket::BucketProvider;
#[cfg(feature = "vimeo")]
pub use vimeo::VimeoProvider;

/// Paged listing and payload download of source items.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short name used in logs and ledger file names.
    fn name(&self) -> &str;

    /// Fetch page `page` (1-based) of at most `per_page` items.
    async fn list_page(&self, page: u32, per_page: u32) -> Result<SourcePage>;

    /// Fetch the payload of one item.
    async fn download(&self, item: &SourceItem) -> Result<Bytes, ItemError>;
}
