//! Objects of an object store container as source items.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use vaulty_core::models::{SourceItem, SourcePage};
use vaulty_core::ItemError;
use vaulty_storage::{ObjectInfo, Storage};

use super::ContentProvider;

/// Serves the objects of one container, in key order.
///
/// The container is listed once, on the first page request; later pages slice that listing
/// so page boundaries stay stable while the run uploads.
pub struct BucketProvider {
    storage: Arc<dyn Storage>,
    container: String,
    listing: OnceCell<Vec<ObjectInfo>>,
}

impl BucketProvider {
    pub fn new(storage: Arc<dyn Storage>, container: impl Into<String>) -> Self {
        Self {
            storage,
            container: container.into(),
            listing: OnceCell::new(),
        }
    }

    async fn listing(&self) -> Result<&[ObjectInfo]> {
        let listing = self
            .listing
            .get_or_try_init(|| async {
                let mut objects: Vec<ObjectInfo> = self
                    .storage
                    .list_contents(&self.container)
                    .await?
                    .try_collect()
                    .await?;
                objects.sort_by(|a, b| a.key.cmp(&b.key));
                tracing::info!(
                    container = %self.container,
                    objects = objects.len(),
                    "Container listed"
                );
                Ok::<_, vaulty_storage::StorageError>(objects)
            })
            .await
            .with_context(|| format!("Failed to list container {}", self.container))?;
        Ok(listing.as_slice())
    }
}

#[async_trait]
impl ContentProvider for BucketProvider {
    fn name(&self) -> &str {
        "bucket"
    }

    async fn list_page(&self, page: u32, per_page: u32) -> Result<SourcePage> {
        let listing = self.listing().await?;
        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1).saturating_mul(per_page);

        let items = listing
            .iter()
            .skip(start)
            .take(per_page)
            .map(|o| {
                SourceItem::new(&o.key)
                    .with_name(&o.key)
                    .with_location(&o.key)
                    .with_size(o.size)
            })
            .collect();

        Ok(SourcePage {
            items,
            has_more: start.saturating_add(per_page) < listing.len(),
        })
    }

    async fn download(&self, item: &SourceItem) -> Result<Bytes, ItemError> {
        let key = item.location.as_deref().unwrap_or(&item.id);
        let data = self.storage.get_object(&self.container, key).await?;
        Ok(data)
    }
}
