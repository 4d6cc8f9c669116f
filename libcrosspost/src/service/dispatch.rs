//! Sequential dispatch loop
//!
//! Platforms are attempted strictly one after another in request order, with
//! a pause between consecutive requests. A failure on one platform is
//! recorded and the loop moves on; only cancellation stops it early.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CrosspostError, PlatformError, Result};
use crate::platforms::{
    AdapterRegistry, AdapterResponse, LinkedInPost, PlatformPayload, SubstackPost, XPost,
};
use crate::sessions::{SessionStore, SUBSTACK_SESSION_KEY};
use crate::types::{MultiPlatformPostRequest, Platform, PlatformPostResult, PostContent};

/// Longest auto-generated media description, in characters
const DESCRIPTION_LIMIT: usize = 200;

/// How the loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Every requested platform settled
    Completed(Vec<PlatformPostResult>),
    /// The token fired; carries the results that settled before it did
    Cancelled(Vec<PlatformPostResult>),
}

/// Runs one request's platforms in order against a set of adapters
#[derive(Clone)]
pub struct Dispatcher {
    adapters: Arc<AdapterRegistry>,
    sessions: Arc<dyn SessionStore>,
    delay: Duration,
}

impl Dispatcher {
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        sessions: Arc<dyn SessionStore>,
        delay: Duration,
    ) -> Self {
        Self {
            adapters,
            sessions,
            delay,
        }
    }

    /// Pause inserted before every platform except the first
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Attempt every platform in `request`
    ///
    /// `on_settled` is called after each platform with the results so far;
    /// the newest result is last. The inter-platform delay and each adapter
    /// call race `cancel`, and a result that arrives after cancellation is
    /// dropped.
    pub async fn run<F>(
        &self,
        request: &MultiPlatformPostRequest,
        cancel: &CancellationToken,
        mut on_settled: F,
    ) -> DispatchOutcome
    where
        F: FnMut(&[PlatformPostResult]) + Send,
    {
        let mut results = Vec::with_capacity(request.platforms.len());

        for (index, platform) in request.platforms.iter().copied().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                debug!(
                    "Waiting {}ms before posting to {}",
                    self.delay.as_millis(),
                    platform
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return DispatchOutcome::Cancelled(results),
                    _ = sleep(self.delay) => {}
                }
            }

            if cancel.is_cancelled() {
                return DispatchOutcome::Cancelled(results);
            }

            info!("Posting to {}", platform);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return DispatchOutcome::Cancelled(results),
                result = self.attempt(platform, request, cancel) => result,
            };

            // An adapter may have returned just as the token fired
            if cancel.is_cancelled() {
                return DispatchOutcome::Cancelled(results);
            }

            if result.success {
                info!("Posted to {}", platform);
            } else {
                warn!(
                    "Failed to post to {}: {}",
                    platform,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }

            results.push(result);
            on_settled(results.as_slice());
        }

        DispatchOutcome::Completed(results)
    }

    /// One platform attempt. Never fails; every error becomes a failed result.
    pub async fn attempt(
        &self,
        platform: Platform,
        request: &MultiPlatformPostRequest,
        cancel: &CancellationToken,
    ) -> PlatformPostResult {
        match self.try_attempt(platform, request, cancel).await {
            Ok(result) => result,
            Err(e) => {
                let message = failure_message(&e);
                let message = if message.trim().is_empty() {
                    format!("Failed to post to {}", platform)
                } else {
                    message
                };
                PlatformPostResult::failed(platform, message)
            }
        }
    }

    async fn try_attempt(
        &self,
        platform: Platform,
        request: &MultiPlatformPostRequest,
        cancel: &CancellationToken,
    ) -> Result<PlatformPostResult> {
        let adapter = self
            .adapters
            .get(platform)
            .ok_or_else(|| PlatformError::Unsupported(platform.to_string()))?;

        let payload = match self.build_payload(platform, request, cancel).await? {
            Ok(payload) => payload,
            Err(failed) => return Ok(failed),
        };

        let response = adapter.submit(&payload, cancel).await?;
        Ok(into_result(platform, response))
    }

    /// Build the request body for `platform`
    ///
    /// The inner `Err` is a recorded failure that happened before the post
    /// endpoint was reached (LinkedIn upload, missing Substack session).
    async fn build_payload(
        &self,
        platform: Platform,
        request: &MultiPlatformPostRequest,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<PlatformPayload, PlatformPostResult>> {
        let content = &request.content;
        let options = &request.platform_specific;

        match platform {
            Platform::LinkedIn => {
                let linkedin = options.linkedin.clone().unwrap_or_default();

                let media_asset = if content.has_uploadable_media() {
                    match self.upload_linkedin_media(request, cancel).await? {
                        Ok(urn) => Some(urn),
                        Err(message) => {
                            return Ok(Err(PlatformPostResult::failed(platform, message)))
                        }
                    }
                } else {
                    None
                };

                Ok(Ok(PlatformPayload::LinkedIn(LinkedInPost {
                    text: content.text.clone(),
                    visibility: linkedin.visibility,
                    media_kind: if media_asset.is_some() {
                        content.media_kind
                    } else {
                        Default::default()
                    },
                    media_asset,
                    article: linkedin.article,
                })))
            }
            Platform::X => {
                let x = options.x.clone().unwrap_or_default();
                Ok(Ok(PlatformPayload::X(XPost {
                    text: content.text.clone(),
                    media: content.media.clone(),
                    media_kind: content.media_kind,
                    reply_to: x.reply_to,
                })))
            }
            Platform::Substack => {
                let session = self
                    .sessions
                    .get(SUBSTACK_SESSION_KEY)?
                    .filter(|s| !s.trim().is_empty());
                let Some(session) = session else {
                    return Ok(Err(PlatformPostResult::failed(
                        platform,
                        "Substack session not found. Please log in to Substack first.",
                    )));
                };

                let substack = options.substack.clone().ok_or_else(|| {
                    CrosspostError::InvalidInput("Substack posts require a title".to_string())
                })?;

                Ok(Ok(PlatformPayload::Substack(SubstackPost {
                    title: substack.title,
                    subtitle: substack.subtitle,
                    body: content.text.clone(),
                    draft: substack.draft,
                    session: SecretString::from(session),
                })))
            }
        }
    }

    /// Upload LinkedIn media; the inner `Err` carries the failure message
    async fn upload_linkedin_media(
        &self,
        request: &MultiPlatformPostRequest,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<String, String>> {
        let Some(media) = request.content.media.as_ref() else {
            return Ok(Err("Failed to upload media to LinkedIn".to_string()));
        };
        let Some(uploader) = self.adapters.media_uploader() else {
            return Ok(Err("Failed to upload media to LinkedIn".to_string()));
        };

        let linkedin = request.platform_specific.linkedin.as_ref();
        let title = linkedin
            .and_then(|l| l.media_title.clone())
            .unwrap_or_else(|| media.file_name.clone());
        let description = linkedin
            .and_then(|l| l.media_description.clone())
            .unwrap_or_else(|| default_description(&request.content));

        debug!(
            "Uploading {} ({} bytes) to LinkedIn",
            media.file_name,
            media.bytes.len()
        );
        let upload = uploader
            .upload_media(media, &title, &description, cancel)
            .await?;

        match upload.asset_urn() {
            Some(urn) if upload.success => Ok(Ok(urn.to_string())),
            _ => Ok(Err(upload
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Failed to upload media to LinkedIn".to_string()))),
        }
    }
}

fn into_result(platform: Platform, response: AdapterResponse) -> PlatformPostResult {
    let error = if response.success {
        None
    } else {
        Some(
            response
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("Failed to post to {}", platform)),
        )
    };

    PlatformPostResult {
        platform,
        success: response.success,
        data: serde_json::to_value(&response).ok(),
        error,
    }
}

/// Message recorded for a raised error, without the crate-level prefix
fn failure_message(error: &CrosspostError) -> String {
    match error {
        CrosspostError::Platform(e) => e.to_string(),
        CrosspostError::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn default_description(content: &PostContent) -> String {
    content.text.chars().take(DESCRIPTION_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::{MockAdapter, MockUpload};
    use crate::sessions::MemorySessionStore;
    use crate::types::{MediaKind, MediaPayload, PlatformSpecificOptions, SubstackOptions};

    fn dispatcher(registry: AdapterRegistry, sessions: MemorySessionStore) -> Dispatcher {
        Dispatcher::new(Arc::new(registry), Arc::new(sessions), Duration::ZERO)
    }

    fn request(platforms: Vec<Platform>) -> MultiPlatformPostRequest {
        MultiPlatformPostRequest {
            platforms,
            content: PostContent::text("hello"),
            platform_specific: PlatformSpecificOptions::default(),
        }
    }

    fn image_request() -> MultiPlatformPostRequest {
        let mut request = request(vec![Platform::LinkedIn]);
        request.content.media = Some(MediaPayload {
            file_name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0; 16],
        });
        request.content.media_kind = MediaKind::Image;
        request
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::success(Platform::X)));
        registry.register(Arc::new(MockAdapter::success(Platform::LinkedIn)));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let mut seen = Vec::new();
        let outcome = dispatcher
            .run(
                &request(vec![Platform::X, Platform::LinkedIn]),
                &CancellationToken::new(),
                |results| seen.push(results.len()),
            )
            .await;

        let DispatchOutcome::Completed(results) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(results[0].platform, Platform::X);
        assert_eq!(results[1].platform, Platform::LinkedIn);
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_loop() {
        let x = MockAdapter::failure(Platform::X, "rate limited");
        let linkedin = MockAdapter::success(Platform::LinkedIn);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(x.clone()));
        registry.register(Arc::new(linkedin.clone()));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let outcome = dispatcher
            .run(
                &request(vec![Platform::X, Platform::LinkedIn]),
                &CancellationToken::new(),
                |_| {},
            )
            .await;

        let DispatchOutcome::Completed(results) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(results[0].error.as_deref(), Some("rate limited"));
        assert!(results[1].success);
        assert_eq!(linkedin.submit_call_count(), 1);
    }

    #[tokio::test]
    async fn test_success_keeps_adapter_response_as_data() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::success(Platform::X)));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::X, &request(vec![Platform::X]), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.error, None);
        let data = result.data.unwrap();
        assert_eq!(data["success"], true);
        assert!(data["data"]["id"].as_str().unwrap().starts_with("x:mock-"));
    }

    #[tokio::test]
    async fn test_unregistered_platform_is_unsupported() {
        let dispatcher = dispatcher(AdapterRegistry::new(), MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::X, &request(vec![Platform::X]), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unsupported platform: x"));
    }

    #[tokio::test]
    async fn test_silent_failure_gets_fallback_message() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::silent_failure(Platform::LinkedIn)));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(
                Platform::LinkedIn,
                &request(vec![Platform::LinkedIn]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.error.as_deref(), Some("Failed to post to linkedin"));
    }

    #[tokio::test]
    async fn test_raised_error_is_recorded() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::raising(Platform::X, "connection reset")));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::X, &request(vec![Platform::X]), &CancellationToken::new())
            .await;

        assert_eq!(result.error.as_deref(), Some("Network error: connection reset"));
    }

    #[tokio::test]
    async fn test_linkedin_upload_precedes_post() {
        let linkedin = MockAdapter::success(Platform::LinkedIn)
            .with_upload(MockUpload::Asset("urn:li:digitalmediaAsset:42".to_string()));
        let mut registry = AdapterRegistry::new();
        registry.register_with_uploader(Arc::new(linkedin.clone()));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::LinkedIn, &image_request(), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(linkedin.upload_call_count(), 1);
        assert_eq!(
            linkedin.submitted()[0].media_asset.as_deref(),
            Some("urn:li:digitalmediaAsset:42")
        );
    }

    #[tokio::test]
    async fn test_linkedin_upload_failure_skips_post() {
        let linkedin = MockAdapter::success(Platform::LinkedIn)
            .with_upload(MockUpload::Failure(Some("File too large".to_string())));
        let mut registry = AdapterRegistry::new();
        registry.register_with_uploader(Arc::new(linkedin.clone()));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::LinkedIn, &image_request(), &CancellationToken::new())
            .await;

        assert_eq!(result.error.as_deref(), Some("File too large"));
        assert_eq!(linkedin.submit_call_count(), 0);
    }

    #[tokio::test]
    async fn test_linkedin_upload_without_asset_uses_fallback() {
        let linkedin =
            MockAdapter::success(Platform::LinkedIn).with_upload(MockUpload::MissingAsset);
        let mut registry = AdapterRegistry::new();
        registry.register_with_uploader(Arc::new(linkedin.clone()));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let result = dispatcher
            .attempt(Platform::LinkedIn, &image_request(), &CancellationToken::new())
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("Failed to upload media to LinkedIn")
        );
        assert_eq!(linkedin.submit_call_count(), 0);
    }

    #[tokio::test]
    async fn test_substack_without_session_fails_locally() {
        let substack = MockAdapter::success(Platform::Substack);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(substack.clone()));
        let dispatcher = dispatcher(registry, MemorySessionStore::new());

        let mut request = request(vec![Platform::Substack]);
        request.platform_specific.substack = Some(SubstackOptions {
            title: "Weekly".to_string(),
            subtitle: None,
            draft: true,
        });

        let result = dispatcher
            .attempt(Platform::Substack, &request, &CancellationToken::new())
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("Substack session not found. Please log in to Substack first.")
        );
        assert_eq!(substack.submit_call_count(), 0);
    }

    #[tokio::test]
    async fn test_substack_session_forwarded() {
        let substack = MockAdapter::success(Platform::Substack);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(substack.clone()));
        let sessions = MemorySessionStore::with_entries([(SUBSTACK_SESSION_KEY, "cookie=abc")]);
        let dispatcher = dispatcher(registry, sessions);

        let mut request = request(vec![Platform::Substack]);
        request.platform_specific.substack = Some(SubstackOptions {
            title: "Weekly".to_string(),
            subtitle: Some("Notes".to_string()),
            draft: false,
        });

        let result = dispatcher
            .attempt(Platform::Substack, &request, &CancellationToken::new())
            .await;

        assert!(result.success);
        let sent = &substack.submitted()[0];
        assert_eq!(sent.title.as_deref(), Some("Weekly"));
        assert_eq!(sent.session.as_deref(), Some("cookie=abc"));
        assert_eq!(sent.text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_platforms_only() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::success(Platform::X)));
        registry.register(Arc::new(MockAdapter::success(Platform::LinkedIn)));
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(MemorySessionStore::new()),
            Duration::from_millis(2000),
        );

        let start = tokio::time::Instant::now();
        let outcome = dispatcher
            .run(
                &request(vec![Platform::X, Platform::LinkedIn]),
                &CancellationToken::new(),
                |_| {},
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::Completed(ref r) if r.len() == 2));
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_returns_partial_results() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::success(Platform::X)));
        let linkedin = MockAdapter::success(Platform::LinkedIn);
        registry.register(Arc::new(linkedin.clone()));
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(10),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let outcome = dispatcher
            .run(
                &request(vec![Platform::X, Platform::LinkedIn]),
                &cancel,
                move |_| trigger.cancel(),
            )
            .await;

        let DispatchOutcome::Cancelled(results) = outcome else {
            panic!("expected cancellation");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(linkedin.submit_call_count(), 0);
    }

    #[test]
    fn test_default_description_truncates() {
        let content = PostContent::text("é".repeat(300));
        assert_eq!(default_description(&content).chars().count(), 200);
    }
}
