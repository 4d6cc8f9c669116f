//! Posting events
//!
//! An in-process broadcast bus. Posting sessions emit events as a run moves
//! along; CLIs, TUIs, or log shippers subscribe without slowing the run down.
//!
//! If no subscribers exist, events are dropped immediately. Lagging
//! subscribers lose the oldest events rather than blocking the emitter.
//!
//! ```
//! use libcrosspost::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.emit(Event::ProgressUpdated { run_id: 1, progress: 10 });
//!
//! while let Ok(event) = events.recv().await {
//!     if let Event::PlatformSettled { result, progress, .. } = event {
//!         eprintln!("[{:>3}%] {}", progress, result.platform.display_name());
//!     }
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{MultiPlatformPostResponse, Platform, PlatformPostResult};

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before lagging kicks in
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers (never blocks)
    pub fn emit(&self, event: Event) {
        // send() only fails when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Events emitted by a posting session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run was accepted and is about to validate
    PostingStarted {
        run_id: u64,
        platforms: Vec<Platform>,
    },

    /// The run's progress value changed (0-100)
    ProgressUpdated { run_id: u64, progress: u8 },

    /// One platform attempt settled
    PlatformSettled {
        run_id: u64,
        result: PlatformPostResult,
        progress: u8,
    },

    /// The run settled with full or partial success
    PostingCompleted {
        run_id: u64,
        response: MultiPlatformPostResponse,
    },

    /// The run settled as a batch-level failure
    PostingFailed { run_id: u64, error: String },

    /// The run was cancelled by the caller
    PostingCancelled { run_id: u64 },
}

impl Event {
    pub fn run_id(&self) -> u64 {
        match self {
            Self::PostingStarted { run_id, .. }
            | Self::ProgressUpdated { run_id, .. }
            | Self::PlatformSettled { run_id, .. }
            | Self::PostingCompleted { run_id, .. }
            | Self::PostingFailed { run_id, .. }
            | Self::PostingCancelled { run_id } => *run_id,
        }
    }
}
