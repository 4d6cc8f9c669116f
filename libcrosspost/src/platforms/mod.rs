//! Platform adapters
//!
//! Each destination is reached through a [`PlatformAdapter`] exposing one
//! normalized `submit` operation. The orchestrator builds a typed
//! [`PlatformPayload`] per platform and never sees HTTP details.
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcrosspost::config::ApiConfig;
//! use libcrosspost::platforms::AdapterRegistry;
//! use libcrosspost::platforms::mock::MockAdapter;
//! use libcrosspost::Platform;
//!
//! # fn example() -> libcrosspost::Result<()> {
//! // Real clients talking to the posting backend
//! let registry = AdapterRegistry::from_config(&ApiConfig::default())?;
//! assert!(registry.get(Platform::X).is_some());
//!
//! // Or assemble one by hand
//! let mut registry = AdapterRegistry::new();
//! registry.register(Arc::new(MockAdapter::success(Platform::X)));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::types::{ArticleMeta, MediaKind, MediaPayload, Platform, Visibility};

pub mod api;
pub mod linkedin;
pub mod substack;
pub mod x;

// Mock adapter is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Normalized answer from a platform's post endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterResponse {
    pub success: bool,
    /// Platform-native response body (post id, URL, ...)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AdapterResponse {
    pub fn ok(data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadData {
    #[serde(rename = "assetUrn", alias = "asset_urn")]
    pub asset_urn: Option<String>,
}

/// Answer from LinkedIn's media upload step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<UploadData>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// The asset identifier, if the upload produced a non-empty one
    pub fn asset_urn(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.asset_urn.as_deref())
            .filter(|urn| !urn.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct LinkedInPost {
    pub text: String,
    pub visibility: Visibility,
    /// Asset from a completed media upload
    pub media_asset: Option<String>,
    pub media_kind: MediaKind,
    pub article: Option<ArticleMeta>,
}

#[derive(Debug, Clone)]
pub struct XPost {
    pub text: String,
    pub media: Option<MediaPayload>,
    pub media_kind: MediaKind,
    pub reply_to: Option<String>,
}

#[derive(Debug)]
pub struct SubstackPost {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    pub draft: bool,
    pub session: SecretString,
}

/// Request body for one platform, built by the dispatch loop
#[derive(Debug)]
pub enum PlatformPayload {
    LinkedIn(LinkedInPost),
    X(XPost),
    Substack(SubstackPost),
}

impl PlatformPayload {
    pub fn platform(&self) -> Platform {
        match self {
            Self::LinkedIn(_) => Platform::LinkedIn,
            Self::X(_) => Platform::X,
            Self::Substack(_) => Platform::Substack,
        }
    }
}

/// Normalized client for one platform
///
/// Implementations must watch `cancel` and abandon their I/O once it fires;
/// the orchestrator stops waiting at that point either way.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Send one post
    ///
    /// `Ok` with `success: false` is a platform-reported failure; `Err` is a
    /// failure to get an answer at all. Both are recorded per platform.
    async fn submit(
        &self,
        payload: &PlatformPayload,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse>;
}

/// Media upload step that must precede a media-bearing LinkedIn post
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_media(
        &self,
        media: &MediaPayload,
        title: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadResponse>;
}

/// Adapters available to a posting session, keyed by platform
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    media_uploader: Option<Arc<dyn MediaUploader>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP clients for every platform, all sharing one backend connection pool
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let api = Arc::new(api::ApiClient::new(config)?);
        let linkedin = Arc::new(linkedin::LinkedInClient::new(Arc::clone(&api)));

        let mut registry = Self::new();
        registry.register_with_uploader(linkedin);
        registry.register(Arc::new(x::XClient::new(Arc::clone(&api))));
        registry.register(Arc::new(substack::SubstackClient::new(api)));
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for its platform
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) -> &mut Self {
        self.adapters.insert(adapter.platform(), adapter);
        self
    }

    /// Register an adapter that also performs LinkedIn media uploads
    pub fn register_with_uploader<A>(&mut self, adapter: Arc<A>) -> &mut Self
    where
        A: PlatformAdapter + MediaUploader + 'static,
    {
        self.media_uploader = Some(adapter.clone() as Arc<dyn MediaUploader>);
        self.register(adapter)
    }

    pub fn set_media_uploader(&mut self, uploader: Arc<dyn MediaUploader>) -> &mut Self {
        self.media_uploader = Some(uploader);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform)
    }

    pub fn media_uploader(&self) -> Option<&Arc<dyn MediaUploader>> {
        self.media_uploader.as_ref()
    }

    /// Registered platforms in canonical order
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.adapters.contains_key(p))
            .collect()
    }
}
