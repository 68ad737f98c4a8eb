//! Shim over the OS AV framework in the `AVPlayer` mould: item status and
//! time-control status observed as key-value changes, push-driven loaded
//! time ranges, and seek completion with a native interruption flag.
//!
//! Quirks absorbed here:
//! - the framework prepares the item itself once it is attached, so
//!   `prepare` is a no-op and readiness arrives as an item-status change;
//! - "waiting to play at the specified rate" is the framework's stall
//!   notion; the `Playing` edge that follows it implies the stall ended,
//!   so a buffering end is synthesized before the playing report;
//! - interrupted seeks surface the framework's own `finished == false`.

use crate::error::Result;
use crate::traits::{BackendCallbacks, PlayerBackend};
use async_trait::async_trait;
use core_runtime::events::BufferedRange;
use parking_lot::Mutex;
use std::sync::Arc;

/// Raw control surface of the AV item and its player.
#[async_trait]
pub trait PlatformAvDriver: Send + Sync {
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn seek_to(&self, position_ms: i64) -> Result<()>;
    async fn current_position_ms(&self) -> Result<i64>;
    async fn duration_ms(&self) -> Result<i64>;
    async fn release(&self) -> Result<()>;
}

/// Observed readiness of the AV item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvItemStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Observed time-control status of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlStatus {
    Paused,
    Playing,
    /// Stalled, waiting for enough buffered media to sustain the rate.
    WaitingToPlay,
}

/// Notices forwarded from the framework's observation thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformAvNotice {
    ItemStatusChanged(AvItemStatus),
    TimeControlChanged(TimeControlStatus),
    LoadedTimeRangesChanged { ranges: Vec<BufferedRange> },
    SeekCompleted { finished: bool },
    DidPlayToEnd,
}

pub struct PlatformAvBackend {
    driver: Arc<dyn PlatformAvDriver>,
    callbacks: BackendCallbacks,
    waiting_to_play: Mutex<bool>,
    last_ranges: Mutex<Vec<BufferedRange>>,
}

impl PlatformAvBackend {
    pub fn new(driver: Arc<dyn PlatformAvDriver>, callbacks: BackendCallbacks) -> Self {
        Self {
            driver,
            callbacks,
            waiting_to_play: Mutex::new(false),
            last_ranges: Mutex::new(Vec::new()),
        }
    }

    /// Entry point for the framework's observation thread.
    pub async fn handle_notice(&self, notice: PlatformAvNotice) {
        match notice {
            PlatformAvNotice::ItemStatusChanged(AvItemStatus::ReadyToPlay) => {
                match self.driver.duration_ms().await {
                    Ok(duration_ms) => self.callbacks.on_ready(duration_ms),
                    Err(e) => self.callbacks.on_error(e.to_string()),
                }
            }
            PlatformAvNotice::ItemStatusChanged(AvItemStatus::Failed) => {
                self.callbacks.on_error("AV item failed to load");
            }
            PlatformAvNotice::ItemStatusChanged(AvItemStatus::Unknown) => {}
            PlatformAvNotice::TimeControlChanged(status) => self.on_time_control(status),
            PlatformAvNotice::LoadedTimeRangesChanged { ranges } => {
                *self.last_ranges.lock() = ranges.clone();
                self.callbacks.on_buffered_ranges(ranges);
            }
            PlatformAvNotice::SeekCompleted { finished } => {
                self.callbacks.on_seek_complete(finished);
            }
            PlatformAvNotice::DidPlayToEnd => self.callbacks.on_ended(),
        }
    }

    fn on_time_control(&self, status: TimeControlStatus) {
        match status {
            TimeControlStatus::Paused => {
                *self.waiting_to_play.lock() = false;
                self.callbacks.on_playing_changed(false);
            }
            TimeControlStatus::WaitingToPlay => {
                *self.waiting_to_play.lock() = true;
                self.callbacks.on_buffering_start();
            }
            TimeControlStatus::Playing => {
                let was_waiting = {
                    let mut waiting = self.waiting_to_play.lock();
                    std::mem::replace(&mut *waiting, false)
                };
                if was_waiting {
                    self.callbacks.on_buffering_end();
                }
                self.callbacks.on_playing_changed(true);
            }
        }
    }
}

#[async_trait]
impl PlayerBackend for PlatformAvBackend {
    async fn prepare(&self) -> Result<()> {
        // The framework prepares the attached item on its own; readiness
        // arrives as an item-status notice.
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.driver.play().await
    }

    async fn pause(&self) -> Result<()> {
        self.driver.pause().await
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
        Ok(self.last_ranges.lock().clone())
    }

    async fn release(&self) -> Result<()> {
        self.driver.release().await
    }

    fn pushes_buffered_ranges(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for PlatformAvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformAvBackend").finish_non_exhaustive()
    }
}
