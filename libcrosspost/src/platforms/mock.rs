//! Mock adapter for testing
//!
//! A configurable [`PlatformAdapter`] (and LinkedIn [`MediaUploader`]) that
//! can report success, report failure, raise an error, or stall. Call counts
//! and the payloads it received are shared through `Arc`s, so a test can keep
//! a clone of the adapter after handing it to a registry.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::{
    AdapterResponse, MediaUploader, PlatformAdapter, PlatformPayload, UploadData, UploadResponse,
};
use crate::error::{PlatformError, Result};
use crate::types::{MediaPayload, Platform};

/// What a mock payload looked like when it reached the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPayload {
    pub platform: Platform,
    /// Post text (Substack: body)
    pub text: String,
    pub media_asset: Option<String>,
    pub has_inline_media: bool,
    pub title: Option<String>,
    pub session: Option<String>,
}

impl From<&PlatformPayload> for SubmittedPayload {
    fn from(payload: &PlatformPayload) -> Self {
        match payload {
            PlatformPayload::LinkedIn(post) => Self {
                platform: Platform::LinkedIn,
                text: post.text.clone(),
                media_asset: post.media_asset.clone(),
                has_inline_media: false,
                title: None,
                session: None,
            },
            PlatformPayload::X(post) => Self {
                platform: Platform::X,
                text: post.text.clone(),
                media_asset: None,
                has_inline_media: post.media.is_some(),
                title: None,
                session: None,
            },
            PlatformPayload::Substack(post) => Self {
                platform: Platform::Substack,
                text: post.body.clone(),
                media_asset: None,
                has_inline_media: false,
                title: Some(post.title.clone()),
                session: Some(post.session.expose_secret().to_string()),
            },
        }
    }
}

/// Behavior of the LinkedIn upload step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockUpload {
    /// Succeeds with the given asset URN
    Asset(String),
    /// Reports success but omits the asset URN
    MissingAsset,
    /// Reports failure with an optional message
    Failure(Option<String>),
    /// Raises an error
    Error(String),
}

/// Configuration for mock adapter behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub platform: Platform,

    /// Whether the adapter reports success
    pub post_succeeds: bool,

    /// Message returned with a reported failure
    pub post_error: Option<String>,

    /// If set, `submit` raises this error instead of answering
    pub raise_error: Option<String>,

    /// Simulated network latency (cancellable)
    pub delay: Duration,

    pub upload: MockUpload,

    pub submit_call_count: Arc<Mutex<usize>>,

    pub upload_call_count: Arc<Mutex<usize>>,

    pub submitted: Arc<Mutex<Vec<SubmittedPayload>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            platform: Platform::X,
            post_succeeds: true,
            post_error: None,
            raise_error: None,
            delay: Duration::ZERO,
            upload: MockUpload::Asset("urn:li:digitalmediaAsset:mock".to_string()),
            submit_call_count: Arc::new(Mutex::new(0)),
            upload_call_count: Arc::new(Mutex::new(0)),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockAdapter {
    config: MockConfig,
}

impl MockAdapter {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Adapter that always reports success
    pub fn success(platform: Platform) -> Self {
        Self::new(MockConfig {
            platform,
            ..Default::default()
        })
    }

    /// Adapter that reports failure with `message`
    pub fn failure(platform: Platform, message: &str) -> Self {
        Self::new(MockConfig {
            platform,
            post_succeeds: false,
            post_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Adapter that reports failure without a message
    pub fn silent_failure(platform: Platform) -> Self {
        Self::new(MockConfig {
            platform,
            post_succeeds: false,
            ..Default::default()
        })
    }

    /// Adapter whose `submit` raises `message`
    pub fn raising(platform: Platform, message: &str) -> Self {
        Self::new(MockConfig {
            platform,
            raise_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Successful adapter that takes `delay` to answer
    pub fn with_delay(platform: Platform, delay: Duration) -> Self {
        Self::new(MockConfig {
            platform,
            delay,
            ..Default::default()
        })
    }

    /// Replace the upload behavior
    pub fn with_upload(mut self, upload: MockUpload) -> Self {
        self.config.upload = upload;
        self
    }

    pub fn submit_call_count(&self) -> usize {
        *self.config.submit_call_count.lock().unwrap()
    }

    pub fn upload_call_count(&self) -> usize {
        *self.config.upload_call_count.lock().unwrap()
    }

    pub fn submitted(&self) -> Vec<SubmittedPayload> {
        self.config.submitted.lock().unwrap().clone()
    }

    async fn simulate_latency(&self, cancel: &CancellationToken) -> Result<()> {
        if self.config.delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(PlatformError::Cancelled.into()),
            _ = sleep(self.config.delay) => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.config.platform
    }

    async fn submit(
        &self,
        payload: &PlatformPayload,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse> {
        *self.config.submit_call_count.lock().unwrap() += 1;

        self.simulate_latency(cancel).await?;

        if let Some(error) = &self.config.raise_error {
            return Err(PlatformError::Network(error.clone()).into());
        }

        self.config
            .submitted
            .lock()
            .unwrap()
            .push(SubmittedPayload::from(payload));

        if self.config.post_succeeds {
            let id = format!("{}:mock-{}", self.config.platform, uuid::Uuid::new_v4());
            Ok(AdapterResponse::ok(Some(serde_json::json!({ "id": id }))))
        } else {
            Ok(AdapterResponse {
                success: false,
                data: None,
                message: self.config.post_error.clone(),
            })
        }
    }
}

#[async_trait]
impl MediaUploader for MockAdapter {
    async fn upload_media(
        &self,
        _media: &MediaPayload,
        _title: &str,
        _description: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadResponse> {
        *self.config.upload_call_count.lock().unwrap() += 1;

        self.simulate_latency(cancel).await?;

        match &self.config.upload {
            MockUpload::Asset(urn) => Ok(UploadResponse {
                success: true,
                data: Some(UploadData {
                    asset_urn: Some(urn.clone()),
                }),
                message: None,
            }),
            MockUpload::MissingAsset => Ok(UploadResponse {
                success: true,
                data: Some(UploadData::default()),
                message: None,
            }),
            MockUpload::Failure(message) => Ok(UploadResponse {
                success: false,
                data: None,
                message: message.clone(),
            }),
            MockUpload::Error(message) => Err(PlatformError::Upload(message.clone()).into()),
        }
    }
}
