//! Service layer for Crosspost
//!
//! The orchestration core, consumable by any interface (CLI, TUI, server)
//! without duplicating its control flow.
//!
//! # Architecture
//!
//! `PostingSession` is the entry point. One call to `submit` flows through:
//!
//! - `validation`: whole-request checks before any network activity
//! - `dispatch`: the sequential per-platform loop with its inter-request delay
//! - `aggregate`: progress arithmetic and batch classification
//!
//! State is observable as `OrchestrationState` snapshots (a `watch` channel)
//! and as an `Event` stream (`EventBus`). `PostingObserver` offers callback
//! hooks for interfaces that prefer them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcrosspost::{Config, FileSessionStore, MultiPlatformPostRequest};
//! use libcrosspost::{Platform, PlatformSpecificOptions, PostContent, PostingSession};
//!
//! # async fn example() -> libcrosspost::Result<()> {
//! let config = Config::load_or_default()?;
//! let sessions = Arc::new(FileSessionStore::new(config.session.expand_path()));
//! let session = PostingSession::from_config(&config, sessions)?;
//!
//! let request = MultiPlatformPostRequest {
//!     platforms: vec![Platform::X, Platform::LinkedIn],
//!     content: PostContent::text("Shipping today"),
//!     platform_specific: PlatformSpecificOptions::default(),
//! };
//!
//! let response = session.submit(request).await?;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod dispatch;
pub mod events;
pub mod observer;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use aggregate::BatchOutcome;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use events::{Event, EventBus, EventReceiver};
pub use observer::{NoopObserver, PostingObserver};
pub use session::{OrchestrationState, PostingSession, SessionOptions};
pub use validation::validate_request;
