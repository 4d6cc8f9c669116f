//! X (formerly Twitter) client

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::api::{media_json, ApiClient};
use super::{AdapterResponse, PlatformAdapter, PlatformPayload};
use crate::error::{PlatformError, Result};
use crate::types::Platform;

pub struct XClient {
    api: Arc<ApiClient>,
}

impl XClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PlatformAdapter for XClient {
    fn platform(&self) -> Platform {
        Platform::X
    }

    async fn submit(
        &self,
        payload: &PlatformPayload,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse> {
        let PlatformPayload::X(post) = payload else {
            return Err(PlatformError::Posting(format!(
                "X client cannot send a {} payload",
                payload.platform()
            ))
            .into());
        };

        // Media is sent inline; the backend handles X's chunked upload
        let body = serde_json::json!({
            "text": post.text,
            "media": post.media.as_ref().map(media_json),
            "mediaType": post.media_kind,
            "replyTo": post.reply_to,
        });

        self.api.post_json("x/post", &body, cancel).await
    }
}
