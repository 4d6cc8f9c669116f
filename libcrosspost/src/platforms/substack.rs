//! Substack client
//!
//! Substack has no public posting API; the backend replays the user's
//! browser session, which travels in the request body.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::api::ApiClient;
use super::{AdapterResponse, PlatformAdapter, PlatformPayload};
use crate::error::{PlatformError, Result};
use crate::types::Platform;

pub struct SubstackClient {
    api: Arc<ApiClient>,
}

impl SubstackClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PlatformAdapter for SubstackClient {
    fn platform(&self) -> Platform {
        Platform::Substack
    }

    async fn submit(
        &self,
        payload: &PlatformPayload,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse> {
        let PlatformPayload::Substack(post) = payload else {
            return Err(PlatformError::Posting(format!(
                "Substack client cannot send a {} payload",
                payload.platform()
            ))
            .into());
        };

        let body = serde_json::json!({
            "title": post.title,
            "subtitle": post.subtitle,
            "body": post.body,
            "draft": post.draft,
            "sessionCookie": post.session.expose_secret(),
        });

        self.api.post_json("substack/post", &body, cancel).await
    }
}
