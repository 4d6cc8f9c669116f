//! Posting session: run lifecycle, cancellation, and transient flags
//!
//! A [`PostingSession`] owns one [`OrchestrationState`] and allows one run at
//! a time. State moves Idle -> Validating -> Dispatching -> Idle; an invalid
//! request or a batch where every platform failed goes straight back to Idle
//! with `post_error` set.
//!
//! Every state change goes through one `watch` channel. A run only publishes
//! while the state still carries its `run_id` and its cancellation token has
//! not fired, so nothing from a cancelled run lands after `cancel_posting`
//! returns. Dropping a `submit` future before it settles cancels its run the
//! same way.
//!
//! `post_success` and `post_error` clear themselves after a delay. The clear
//! is a spawned task, aborted when a new run begins or the state is reset.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregate::{progress_for, BatchOutcome, COMPLETE_PROGRESS, STARTED_PROGRESS};
use super::dispatch::{DispatchOutcome, Dispatcher};
use super::events::{Event, EventBus, EventReceiver};
use super::observer::{NoopObserver, PostingObserver};
use super::validation::validate_request;
use crate::config::{Config, PostingConfig};
use crate::error::{CrosspostError, Result};
use crate::platforms::AdapterRegistry;
use crate::sessions::SessionStore;
use crate::types::{
    MultiPlatformPostRequest, MultiPlatformPostResponse, Platform, PlatformPostResult,
};

/// Error message left behind by `cancel_posting`
pub const CANCELLED_MESSAGE: &str = "Posting cancelled by user";

/// Observable state of a posting session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestrationState {
    /// True from `submit` until the run settles or is cancelled
    pub is_posting: bool,
    /// Set when every platform succeeded; clears itself
    pub post_success: bool,
    /// Batch-level failure or cancellation message; clears itself
    pub post_error: Option<String>,
    /// 0 idle, 10 once validated, 100 when the loop completes
    pub upload_progress: u8,
    /// Platforms of the current (or last) run, in request order
    pub current_platforms: Vec<Platform>,
    /// Results of the current (or last) run, growing as platforms settle
    pub results: Vec<PlatformPostResult>,
    /// Generation of the run that owns this state
    pub run_id: u64,
}

/// Timing knobs of a posting session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Pause between consecutive platform requests
    pub delay: Duration,
    /// How long `post_success` stays set
    pub success_clear: Duration,
    /// How long `post_error` stays set
    pub error_clear: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&PostingConfig::default())
    }
}

impl From<&PostingConfig> for SessionOptions {
    fn from(config: &PostingConfig) -> Self {
        Self {
            delay: config.delay(),
            success_clear: config.success_clear(),
            error_clear: config.error_clear(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Success,
    Error,
}

/// Handles that outlive a single publication
#[derive(Default)]
struct RunControl {
    cancel: Option<CancellationToken>,
    success_timer: Option<JoinHandle<()>>,
    error_timer: Option<JoinHandle<()>>,
}

impl RunControl {
    fn abort_timers(&mut self) {
        if let Some(timer) = self.success_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.error_timer.take() {
            timer.abort();
        }
    }
}

struct Run {
    id: u64,
    cancel: CancellationToken,
}

/// Cancels its run if `submit` is dropped before the run settles
struct RunGuard<'a> {
    session: &'a PostingSession,
    run_id: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.session.cancel_run(Some(self.run_id)) {
            warn!("Run {} dropped before settling", self.run_id);
        }
    }
}

/// Orchestrates posting one request to its platforms
pub struct PostingSession {
    adapters: Arc<AdapterRegistry>,
    sessions: Arc<dyn SessionStore>,
    options: SessionOptions,
    observer: Arc<dyn PostingObserver>,
    events: EventBus,
    state: Arc<watch::Sender<OrchestrationState>>,
    // Lock order: `control`, then the watch channel
    control: Mutex<RunControl>,
}

impl PostingSession {
    pub fn new(adapters: AdapterRegistry, sessions: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(OrchestrationState::default());
        Self {
            adapters: Arc::new(adapters),
            sessions,
            options: SessionOptions::default(),
            observer: Arc::new(NoopObserver),
            events: EventBus::default(),
            state: Arc::new(state),
            control: Mutex::new(RunControl::default()),
        }
    }

    /// Session with HTTP adapters and timings taken from `config`
    pub fn from_config(config: &Config, sessions: Arc<dyn SessionStore>) -> Result<Self> {
        let adapters = AdapterRegistry::from_config(&config.api)?;
        Ok(Self::new(adapters, sessions).with_options(SessionOptions::from(&config.posting)))
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the inter-platform delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.options.delay = delay;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PostingObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Emit events on a shared bus instead of a private one
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Snapshot of the current state
    pub fn state(&self) -> OrchestrationState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every published state change
    pub fn subscribe_state(&self) -> watch::Receiver<OrchestrationState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn is_posting(&self) -> bool {
        self.state.borrow().is_posting
    }

    /// Post `request` to each of its platforms in order
    ///
    /// Per-platform failures never surface as `Err`; they are recorded in
    /// the response. An invalid request, a batch where every platform failed,
    /// or a cancelled run all come back as `Ok` with `success: false`.
    ///
    /// # Errors
    ///
    /// Returns [`CrosspostError::Busy`] if a run is already in flight.
    pub async fn submit(&self, request: MultiPlatformPostRequest) -> Result<MultiPlatformPostResponse> {
        let run = self.begin_run(&request)?;
        let _guard = RunGuard {
            session: self,
            run_id: run.id,
        };
        info!(
            "Starting run {} for {} platform(s)",
            run.id,
            request.platforms.len()
        );
        self.events.emit(Event::PostingStarted {
            run_id: run.id,
            platforms: request.platforms.clone(),
        });

        if let Err(e) = validate_request(&request) {
            let message = e.to_string();
            warn!("Rejected request: {}", message);
            return Ok(self.fail_run(&run, &request.platforms, message, Vec::new()));
        }

        if self.publish(&run, |s| s.upload_progress = STARTED_PROGRESS) {
            self.events.emit(Event::ProgressUpdated {
                run_id: run.id,
                progress: STARTED_PROGRESS,
            });
        }

        let total = request.platforms.len();
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.adapters),
            Arc::clone(&self.sessions),
            self.options.delay,
        );

        let outcome = dispatcher
            .run(&request, &run.cancel, |results| {
                self.on_platform_settled(&run, results, total)
            })
            .await;

        let results = match outcome {
            DispatchOutcome::Completed(results) => results,
            DispatchOutcome::Cancelled(results) => {
                info!("Run {} cancelled after {} platform(s)", run.id, results.len());
                return Ok(cancelled_response(results));
            }
        };

        match BatchOutcome::classify(&results) {
            outcome @ BatchOutcome::Total { .. } => {
                let message = outcome.message();
                warn!("{}", message);
                Ok(self.fail_run(&run, &request.platforms, message, results))
            }
            outcome => {
                let full = outcome.is_success();
                let response = outcome.into_response(results);

                let settled = self.finish_run(
                    &run,
                    |s| {
                        s.upload_progress = COMPLETE_PROGRESS;
                        s.results = response.results.clone();
                        s.post_success = full;
                    },
                    full.then_some(Flag::Success),
                );
                if !settled {
                    return Ok(cancelled_response(response.results));
                }

                info!("{}", response.message);
                self.events.emit(Event::PostingCompleted {
                    run_id: run.id,
                    response: response.clone(),
                });
                if full {
                    self.observer.on_success(&response);
                } else {
                    self.observer.on_partial_success(&response.results);
                }
                Ok(response)
            }
        }
    }

    /// Cancel the in-flight run, if any
    ///
    /// Takes effect immediately: `is_posting` goes false, progress drops to 0
    /// and `post_error` is set. Adapters see the token and abandon their I/O;
    /// whatever they return afterwards is ignored. Returns false when idle.
    pub fn cancel_posting(&self) -> bool {
        self.cancel_run(None)
    }

    /// Cancel the in-flight run, restricted to `only` when given
    fn cancel_run(&self, only: Option<u64>) -> bool {
        let mut control = self.lock_control();
        let Some(token) = control.cancel.clone() else {
            return false;
        };

        let mut cancelled_run = None;
        self.state.send_if_modified(|s| {
            if !s.is_posting || only.is_some_and(|id| id != s.run_id) {
                return false;
            }
            token.cancel();
            s.is_posting = false;
            s.upload_progress = 0;
            s.post_success = false;
            s.post_error = Some(CANCELLED_MESSAGE.to_string());
            cancelled_run = Some(s.run_id);
            true
        });

        let Some(run_id) = cancelled_run else {
            return false;
        };
        control.cancel = None;
        self.schedule_clear(&mut control, run_id, Flag::Error);
        drop(control);

        info!("Cancelled run {}", run_id);
        self.events.emit(Event::PostingCancelled { run_id });
        true
    }

    /// Clear flags, progress, results and the platform snapshot
    ///
    /// # Errors
    ///
    /// Returns [`CrosspostError::Busy`] while a run is in flight.
    pub fn reset_state(&self) -> Result<()> {
        let mut control = self.lock_control();

        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.is_posting {
                busy = true;
                return false;
            }
            let cleared = OrchestrationState {
                run_id: s.run_id,
                ..Default::default()
            };
            if *s == cleared {
                return false;
            }
            *s = cleared;
            true
        });

        if busy {
            return Err(CrosspostError::Busy);
        }
        control.abort_timers();
        debug!("Posting state reset");
        Ok(())
    }

    fn lock_control(&self) -> MutexGuard<'_, RunControl> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the state for a new run
    fn begin_run(&self, request: &MultiPlatformPostRequest) -> Result<Run> {
        let mut control = self.lock_control();
        let cancel = CancellationToken::new();

        let mut claimed = None;
        self.state.send_if_modified(|s| {
            if s.is_posting {
                return false;
            }
            let id = s.run_id + 1;
            *s = OrchestrationState {
                is_posting: true,
                current_platforms: request.platforms.clone(),
                run_id: id,
                ..Default::default()
            };
            claimed = Some(id);
            true
        });

        let Some(id) = claimed else {
            return Err(CrosspostError::Busy);
        };

        control.abort_timers();
        control.cancel = Some(cancel.clone());
        Ok(Run { id, cancel })
    }

    /// Apply `update` if `run` still owns the state; returns whether it did
    fn publish(&self, run: &Run, update: impl FnOnce(&mut OrchestrationState)) -> bool {
        self.state.send_if_modified(|s| {
            if s.run_id != run.id || run.cancel.is_cancelled() {
                return false;
            }
            update(s);
            true
        })
    }

    fn on_platform_settled(&self, run: &Run, results: &[PlatformPostResult], total: usize) {
        let Some(latest) = results.last() else {
            return;
        };
        let progress = progress_for(results.len(), total);

        let applied = self.publish(run, |s| {
            s.results = results.to_vec();
            s.upload_progress = s.upload_progress.max(progress);
        });
        if !applied {
            return;
        }

        self.events.emit(Event::PlatformSettled {
            run_id: run.id,
            result: latest.clone(),
            progress,
        });
        if latest.success {
            self.observer.on_partial_success(results);
        }
    }

    /// Final publication of a run: leaves `is_posting` false and arms the
    /// auto-clear for `flag`
    fn finish_run(
        &self,
        run: &Run,
        update: impl FnOnce(&mut OrchestrationState),
        flag: Option<Flag>,
    ) -> bool {
        let mut control = self.lock_control();
        let applied = self.publish(run, |s| {
            update(s);
            s.is_posting = false;
        });
        if !applied {
            return false;
        }

        control.cancel = None;
        if let Some(flag) = flag {
            self.schedule_clear(&mut control, run.id, flag);
        }
        true
    }

    /// Settle `run` as a batch-level failure
    fn fail_run(
        &self,
        run: &Run,
        platforms: &[Platform],
        message: String,
        results: Vec<PlatformPostResult>,
    ) -> MultiPlatformPostResponse {
        // Validation failures never reached the loop and keep progress at 0
        let dispatched = !results.is_empty();
        let settled = self.finish_run(
            run,
            |s| {
                if dispatched {
                    s.upload_progress = COMPLETE_PROGRESS;
                    s.results = results.clone();
                }
                s.post_success = false;
                s.post_error = Some(message.clone());
            },
            Some(Flag::Error),
        );
        if !settled {
            return cancelled_response(results);
        }

        self.events.emit(Event::PostingFailed {
            run_id: run.id,
            error: message.clone(),
        });
        self.observer.on_error(&message);
        MultiPlatformPostResponse::failure(platforms, message)
    }

    /// Arm the auto-clear for `flag`, replacing any pending one
    fn schedule_clear(&self, control: &mut RunControl, run_id: u64, flag: Flag) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No tokio runtime; {:?} flag will not auto-clear", flag);
            return;
        };

        let delay = match flag {
            Flag::Success => self.options.success_clear,
            Flag::Error => self.options.error_clear,
        };
        let state = Arc::clone(&self.state);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_if_modified(|s| {
                if s.run_id != run_id {
                    return false;
                }
                match flag {
                    Flag::Success => std::mem::replace(&mut s.post_success, false),
                    Flag::Error => s.post_error.take().is_some(),
                }
            });
        });

        let slot = match flag {
            Flag::Success => &mut control.success_timer,
            Flag::Error => &mut control.error_timer,
        };
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }
}

impl Drop for PostingSession {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
        control.abort_timers();
    }
}

fn cancelled_response(results: Vec<PlatformPostResult>) -> MultiPlatformPostResponse {
    MultiPlatformPostResponse {
        success: false,
        results,
        message: CANCELLED_MESSAGE.to_string(),
    }
}
