//! Error types for Crosspost

use thiserror::Error;

use crate::types::Platform;

pub type Result<T> = std::result::Result<T, CrosspostError>;

#[derive(Error, Debug)]
pub enum CrosspostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    #[error("A post is already in progress")]
    Busy,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CrosspostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosspostError::InvalidInput(_) | CrosspostError::Validation(_) => 3,
            CrosspostError::Platform(PlatformError::Authentication(_)) => 2,
            CrosspostError::Platform(_) => 1,
            CrosspostError::Config(_) => 1,
            CrosspostError::Session(_) => 1,
            CrosspostError::Busy => 1,
            CrosspostError::Output(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Request-level validation failures, raised before any network activity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one platform")]
    NoPlatforms,

    #[error("Substack posts require a title")]
    MissingSubstackTitle,

    #[error("Platform selected more than once: {0}")]
    DuplicatePlatform(Platform),
}

/// Failure of a single platform attempt
///
/// These never abort a batch; the dispatch loop records them as that
/// platform's result.
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Media upload failed: {0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    #[error("Request cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Refusing to use session file '{0}': it is a symbolic link")]
    Symlink(String),
}
