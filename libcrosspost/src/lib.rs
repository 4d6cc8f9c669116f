//! Crosspost - submit one post to LinkedIn, X and Substack
//!
//! This library provides the orchestration core for posting a single piece of
//! content to a selected set of platforms one at a time, with live progress,
//! partial-failure accounting, and cooperative cancellation.

pub mod config;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod service;
pub mod sessions;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{CrosspostError, Result};
pub use service::session::{OrchestrationState, PostingSession};
pub use sessions::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::{
    MediaKind, MediaPayload, MultiPlatformPostRequest, MultiPlatformPostResponse, Platform,
    PlatformPostResult, PlatformSpecificOptions, PostContent,
};
