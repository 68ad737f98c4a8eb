//! Shim over an adaptive-streaming engine in the `ExoPlayer` mould: a
//! four-state stream machine crossed with a `play_when_ready` flag, and
//! push-driven loaded-range reporting.
//!
//! Quirks absorbed here:
//! - the first transition to `Ready` is "prepared", every later
//!   `Buffering → Ready` edge is a buffering end;
//! - the initial buffer fill overlaps preparation, so no buffering-end is
//!   raised alongside the prepared edge;
//! - play state is derived from `play_when_ready` edges, since the engine
//!   has no dedicated is-playing callback.

use crate::error::Result;
use crate::traits::{BackendCallbacks, PlayerBackend};
use async_trait::async_trait;
use core_runtime::events::BufferedRange;
use parking_lot::Mutex;
use std::sync::Arc;

/// Raw control surface of the streaming engine.
#[async_trait]
pub trait AdaptiveStreamDriver: Send + Sync {
    async fn prepare(&self) -> Result<()>;
    async fn set_play_when_ready(&self, play: bool) -> Result<()>;
    async fn seek_to(&self, position_ms: i64) -> Result<()>;
    async fn current_position_ms(&self) -> Result<i64>;
    async fn duration_ms(&self) -> Result<i64>;
    async fn buffered_ranges(&self) -> Result<Vec<BufferedRange>>;
    async fn release(&self) -> Result<()>;
}

/// The engine's coarse stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Notices the engine raises on its own thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AdaptiveStreamNotice {
    StateChanged {
        state: StreamState,
        play_when_ready: bool,
    },
    SeekProcessed,
    LoadedRangesChanged {
        ranges: Vec<BufferedRange>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Default)]
struct ShimState {
    prepared: bool,
    buffering: bool,
    playing: bool,
}

pub struct AdaptiveStreamBackend {
    driver: Arc<dyn AdaptiveStreamDriver>,
    callbacks: BackendCallbacks,
    shim: Mutex<ShimState>,
}

impl AdaptiveStreamBackend {
    pub fn new(driver: Arc<dyn AdaptiveStreamDriver>, callbacks: BackendCallbacks) -> Self {
        Self {
            driver,
            callbacks,
            shim: Mutex::new(ShimState::default()),
        }
    }

    /// Entry point for the engine's notice thread.
    pub async fn handle_notice(&self, notice: AdaptiveStreamNotice) {
        match notice {
            AdaptiveStreamNotice::StateChanged {
                state,
                play_when_ready,
            } => self.on_state_changed(state, play_when_ready).await,
            AdaptiveStreamNotice::SeekProcessed => self.callbacks.on_seek_complete(true),
            AdaptiveStreamNotice::LoadedRangesChanged { ranges } => {
                self.callbacks.on_buffered_ranges(ranges);
            }
            AdaptiveStreamNotice::Failed { reason } => self.callbacks.on_error(reason),
        }
    }

    async fn on_state_changed(&self, state: StreamState, play_when_ready: bool) {
        let mut just_prepared = false;
        let mut buffering_started = false;
        let mut buffering_ended = false;
        let mut playing_edge = None;
        let mut ended = false;

        // Decide all edges under the shim lock, emit after it is dropped.
        {
            let mut shim = self.shim.lock();
            match state {
                StreamState::Idle => {}
                StreamState::Buffering => {
                    if !shim.buffering {
                        shim.buffering = true;
                        buffering_started = shim.prepared;
                    }
                }
                StreamState::Ready => {
                    if shim.buffering {
                        shim.buffering = false;
                        buffering_ended = shim.prepared;
                    }
                    if !shim.prepared {
                        shim.prepared = true;
                        just_prepared = true;
                    }
                    if shim.playing != play_when_ready {
                        shim.playing = play_when_ready;
                        playing_edge = Some(play_when_ready);
                    }
                }
                StreamState::Ended => {
                    if shim.playing {
                        shim.playing = false;
                        playing_edge = Some(false);
                    }
                    ended = true;
                }
            }
        }

        if just_prepared {
            match self.driver.duration_ms().await {
                Ok(duration_ms) => self.callbacks.on_ready(duration_ms),
                Err(e) => {
                    self.callbacks.on_error(e.to_string());
                    return;
                }
            }
        }
        if buffering_started {
            self.callbacks.on_buffering_start();
        }
        if buffering_ended {
            self.callbacks.on_buffering_end();
        }
        if let Some(playing) = playing_edge {
            self.callbacks.on_playing_changed(playing);
        }
        if ended {
            self.callbacks.on_ended();
        }
    }
}

#[async_trait]
impl PlayerBackend for AdaptiveStreamBackend {
    async fn prepare(&self) -> Result<()> {
        self.driver.prepare().await
    }

    async fn play(&self) -> Result<()> {
        self.driver.set_play_when_ready(true).await
    }

    async fn pause(&self) -> Result<()> {
        self.driver.set_play_when_ready(false).await
    }

    async fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.driver.seek_to(position_ms).await
    }

    async fn position_millis(&self) -> Result<i64> {
        self.driver.current_position_ms().await
    }

    async fn duration_millis(&self) -> Result<i64> {
        self.driver.duration_ms().await
    }

    async fn buffered_ranges(&self) -> Result<Vec<BufferedRange>> {
        self.driver.buffered_ranges().await
    }

    async fn release(&self) -> Result<()> {
        self.driver.release().await
    }

    fn pushes_buffered_ranges(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for AdaptiveStreamBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveStreamBackend").finish_non_exhaustive()
    }
}
