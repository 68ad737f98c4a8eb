//! Shim over a single-track software decoder in the `MediaPlayer` mould:
//! an asynchronous prepare, coarse info notices, and a single buffered
//! watermark instead of real ranges.
//!
//! Quirks absorbed here:
//! - the decoder has no play-state callback, so `play`/`pause` confirm
//!   the state change synchronously after the control call succeeds;
//! - seek completion never carries an interruption flag, so it is always
//!   forwarded as `finished`;
//! - the buffered watermark is turned into a single `[0, watermark)`
//!   range and reported by polling.

use crate::error::Result;
use crate::traits::{BackendCallbacks, PlayerBackend};
use async_trait::async_trait;
use core_runtime::events::BufferedRange;
use std::sync::Arc;
use tracing::debug;

/// Raw control surface of the software decoder.
#[async_trait]
pub trait SoftwareDecoderDriver: Send + Sync {
    async fn prepare_async(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn seek_to(&self, position_ms: i64) -> Result<()>;
    async fn current_position_ms(&self) -> Result<i64>;
    async fn duration_ms(&self) -> Result<i64>;
    /// Furthest decoded-and-buffered position, in milliseconds.
    async fn buffered_position_ms(&self) -> Result<i64>;
    async fn release(&self) -> Result<()>;
}

/// Notices the decoder raises on its own thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftwareDecoderNotice {
    Prepared { duration_ms: i64 },
    Info(SoftwareInfoCode),
    SeekComplete,
    Completed,
    Error { code: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwareInfoCode {
    BufferingStart,
    BufferingEnd,
    Unknown(i32),
}

pub struct SoftwareDecoderBackend {
    driver: Arc<dyn SoftwareDecoderDriver>,
    callbacks: BackendCallbacks,
}

impl SoftwareDecoderBackend {
    pub fn new(driver: Arc<dyn SoftwareDecoderDriver>, callbacks: BackendCallbacks) -> Self {
        Self { driver, callbacks }
    }

    /// Entry point for the decoder's notice thread.
    pub fn handle_notice(&self, notice: SoftwareDecoderNotice) {
        match notice {
            SoftwareDecoderNotice::Prepared { duration_ms } => {
                self.callbacks.on_ready(duration_ms);
            }
            SoftwareDecoderNotice::Info(SoftwareInfoCode::BufferingStart) => {
                self.callbacks.on_buffering_start();
            }
            SoftwareDecoderNotice::Info(SoftwareInfoCode::BufferingEnd) => {
                self.callbacks.on_buffering_end();
            }
            SoftwareDecoderNotice::Info(SoftwareInfoCode::Unknown(code)) => {
                debug!(code, "unhandled software decoder info");
            }
            SoftwareDecoderNotice::SeekComplete => {
                // The decoder cannot report interrupted seeks.
                self.callbacks.on_seek_complete(true);
            }
            SoftwareDecoderNotice::Completed => {
                self.callbacks.on_ended();
            }
            SoftwareDecoderNotice::Error { code } => {
                self.callbacks
                    .on_error(format!("software decoder error (code {code})"));
            }
        }
    }
}

#[async_trait]
impl PlayerBackend for SoftwareDecoderBackend {
    async fn prepare(&self) -> Result<()> {
        self.driver.prepare_async().await
    }

    async fn play(&self) -> Result<()> {
        self.driver.start().await?;
        self.callbacks.on_playing_changed(true);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.driver.pause().await?;
        self.callbacks.on_playing_changed(false);
        Ok(())
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
        let watermark = self.driver.buffered_position_ms().await?;
        if watermark > 0 {
            Ok(vec![BufferedRange::new(0, watermark)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn release(&self) -> Result<()> {
        self.driver.release().await
    }
}

impl std::fmt::Debug for SoftwareDecoderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareDecoderBackend").finish_non_exhaustive()
    }
}
