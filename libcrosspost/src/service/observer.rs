//! Observer hooks for interface-agnostic notifications
//!
//! A [`PostingObserver`] is told about successful platforms as they land and
//! about the way a run settles. Every method has a no-op default, so an
//! interface only implements what it renders.

use crate::types::{MultiPlatformPostResponse, PlatformPostResult};

/// Notification hooks for a posting session
///
/// Called synchronously from the dispatch loop; implementations should hand
/// work off rather than block.
pub trait PostingObserver: Send + Sync {
    /// A platform succeeded. `results` is every result of the run so far.
    ///
    /// Also called once more with the full result set when a run ends in
    /// partial success.
    fn on_partial_success(&self, _results: &[PlatformPostResult]) {}

    /// Every platform succeeded
    fn on_success(&self, _response: &MultiPlatformPostResponse) {}

    /// The run failed as a whole (invalid request or all platforms failed)
    fn on_error(&self, _message: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PostingObserver for NoopObserver {}
