//! Core types for Crosspost

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CrosspostError, Result};

/// Destination platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    X,
    Substack,
}

impl Platform {
    /// All supported platforms, in their canonical order
    pub const ALL: [Platform; 3] = [Platform::LinkedIn, Platform::X, Platform::Substack];

    /// Lowercase wire tag (e.g. "linkedin")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::X => "x",
            Self::Substack => "substack",
        }
    }

    /// Human-readable name for terminal output
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::X => "X",
            Self::Substack => "Substack",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = CrosspostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(Self::LinkedIn),
            "x" | "twitter" => Ok(Self::X),
            "substack" => Ok(Self::Substack),
            other => Err(CrosspostError::InvalidInput(format!(
                "Unknown platform '{}'. Valid options: linkedin, x, substack",
                other
            ))),
        }
    }
}

/// Kind of media carried by a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    #[default]
    Text,
    Image,
    Video,
}

impl MediaKind {
    /// Detect media kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(Self::Image),
            "mp4" | "mov" | "webm" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Raw media attached to a post
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPayload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Content of a post. Owned by the caller, read-only to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub text: String,
    pub media: Option<MediaPayload>,
    #[serde(default)]
    pub media_kind: MediaKind,
}

impl PostContent {
    /// Text-only content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: None,
            media_kind: MediaKind::Text,
        }
    }

    /// Attach media loaded from a file, inferring its kind from the extension
    pub fn with_media_file(mut self, path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let kind = MediaKind::from_extension(ext).ok_or_else(|| {
            CrosspostError::InvalidInput(format!(
                "Unsupported media file '{}'. Use jpg, png, gif, webp, mp4, mov or webm",
                path.display()
            ))
        })?;

        let bytes = std::fs::read(path).map_err(|e| {
            CrosspostError::InvalidInput(format!(
                "Failed to read media file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string());

        self.media = Some(MediaPayload {
            file_name,
            mime_type: mime_for_extension(ext).to_string(),
            bytes,
        });
        self.media_kind = kind;
        Ok(self)
    }

    /// Whether this content carries an image or video that needs uploading
    pub fn has_uploadable_media(&self) -> bool {
        self.media.is_some() && matches!(self.media_kind, MediaKind::Image | MediaKind::Video)
    }
}

/// LinkedIn post visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
}

/// Link preview attached to a LinkedIn post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInOptions {
    #[serde(default)]
    pub visibility: Visibility,
    pub article: Option<ArticleMeta>,
    /// Title sent with the media upload
    pub media_title: Option<String>,
    /// Description sent with the media upload
    pub media_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XOptions {
    /// Post id to reply to
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstackOptions {
    pub title: String,
    pub subtitle: Option<String>,
    /// Save as a draft instead of publishing
    #[serde(default = "default_true")]
    pub draft: bool,
}

fn default_true() -> bool {
    true
}

/// Per-platform optional settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpecificOptions {
    pub linkedin: Option<LinkedInOptions>,
    pub x: Option<XOptions>,
    pub substack: Option<SubstackOptions>,
}

/// One submission: content plus the ordered platforms to post it to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPlatformPostRequest {
    /// Execution order is the order of this list
    pub platforms: Vec<Platform>,
    pub content: PostContent,
    #[serde(default)]
    pub platform_specific: PlatformSpecificOptions,
}

/// Outcome of a single platform attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPostResult {
    pub platform: Platform,
    pub success: bool,
    /// Full adapter response, when the adapter produced one
    pub data: Option<serde_json::Value>,
    /// Failure message (only set when unsuccessful)
    pub error: Option<String>,
}

impl PlatformPostResult {
    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Terminal artifact of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPlatformPostResponse {
    /// True iff no platform failed
    pub success: bool,
    pub results: Vec<PlatformPostResult>,
    pub message: String,
}

impl MultiPlatformPostResponse {
    /// Batch-level failure: one failed entry per requested platform, each
    /// carrying the top-level message
    pub fn failure(platforms: &[Platform], message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            results: platforms
                .iter()
                .map(|p| PlatformPostResult::failed(*p, message.clone()))
                .collect(),
            message,
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}
