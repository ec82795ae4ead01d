//! Vimeo video library provider.
//!
//! Lists the videos of the authenticated account page by page and downloads the largest
//! available rendition of each.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use vaulty_core::models::{SourceItem, SourcePage};
use vaulty_core::{ItemError, ItemResultExt};

use super::ContentProvider;

const ACCEPT: &str = "application/vnd.vimeo.*+json;version=3.4";
const LIST_FIELDS: &str = "uri,name,download";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    paging: Paging,
    #[serde(default)]
    data: Vec<Video>,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Video {
    uri: String,
    name: Option<String>,
    #[serde(default)]
    download: Vec<Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    link: String,
    #[serde(default)]
    size: Option<u64>,
}

impl Video {
    fn into_item(self) -> SourceItem {
        let best = self
            .download
            .into_iter()
            .max_by_key(|r| r.size.unwrap_or(0));

        let mut item = SourceItem::new(self.uri);
        if let Some(name) = self.name {
            item = item.with_name(name);
        }
        if let Some(rendition) = best {
            item = item.with_location(rendition.link);
            if let Some(size) = rendition.size {
                item = item.with_size(size);
            }
        }
        item
    }
}

pub struct VimeoProvider {
    client: Client,
    base_url: String,
    access_token: String,
}

impl VimeoProvider {
    pub fn new(base_url: &str, access_token: String) -> Result<Self> {
        // Downloads of full videos can take a while; only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

fn request_error(err: reqwest::Error) -> ItemError {
    match err.status() {
        Some(status) => ItemError::from_http_status(status.as_u16(), err.to_string()),
        None => ItemError::Transient(err.to_string()),
    }
}

#[async_trait]
impl ContentProvider for VimeoProvider {
    fn name(&self) -> &str {
        "vimeo"
    }

    #[tracing::instrument(skip(self), fields(provider = "vimeo"))]
    async fn list_page(&self, page: u32, per_page: u32) -> Result<SourcePage> {
        let url = format!("{}/me/videos", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .query(&[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("fields", LIST_FIELDS.to_string()),
            ])
            .send()
            .await
            .context("Failed to request video listing")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Video listing failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: VideoListResponse = response
            .json()
            .await
            .context("Failed to parse video listing")?;

        let has_more = body.paging.next.is_some();
        let items: Vec<SourceItem> = body.data.into_iter().map(Video::into_item).collect();

        tracing::debug!(items = items.len(), has_more, "Video page listed");
        Ok(SourcePage { items, has_more })
    }

    async fn download(&self, item: &SourceItem) -> Result<Bytes, ItemError> {
        let link = item.location.as_deref().ok_or_else(|| {
            ItemError::InvalidPayload(format!("Video {} has no download link", item.id))
        })?;

        let start = std::time::Instant::now();
        let response = self
            .client
            .get(link)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?;

        // A body cut off mid-transfer is worth retrying whatever its cause.
        let data = response.bytes().await.transient()?;

        tracing::info!(
            id = %item.id,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video downloaded"
        );
        Ok(data)
    }
}
