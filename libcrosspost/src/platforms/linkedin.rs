//! LinkedIn client
//!
//! Media-bearing posts take two calls: `linkedin/upload` returns an asset
//! URN, which `linkedin/post` then references.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::api::{media_json, ApiClient};
use super::{AdapterResponse, MediaUploader, PlatformAdapter, PlatformPayload, UploadResponse};
use crate::error::{PlatformError, Result};
use crate::types::{MediaPayload, Platform};

pub struct LinkedInClient {
    api: Arc<ApiClient>,
}

impl LinkedInClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PlatformAdapter for LinkedInClient {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn submit(
        &self,
        payload: &PlatformPayload,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse> {
        let PlatformPayload::LinkedIn(post) = payload else {
            return Err(PlatformError::Posting(format!(
                "LinkedIn client cannot send a {} payload",
                payload.platform()
            ))
            .into());
        };

        let body = serde_json::json!({
            "text": post.text,
            "visibility": post.visibility,
            "mediaAsset": post.media_asset,
            "mediaType": post.media_kind,
            "article": post.article.as_ref().map(|a| serde_json::json!({
                "url": a.url,
                "title": a.title,
                "description": a.description,
            })),
        });

        self.api.post_json("linkedin/post", &body, cancel).await
    }
}

#[async_trait]
impl MediaUploader for LinkedInClient {
    async fn upload_media(
        &self,
        media: &MediaPayload,
        title: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadResponse> {
        let body = serde_json::json!({
            "media": media_json(media),
            "title": title,
            "description": description,
        });

        self.api.post_json("linkedin/upload", &body, cancel).await
    }
}
