//! # Core Playback Traits
//!
//! This module defines the core abstractions for the playback session layer:
//! the media source model, the backend capability surface, and the callback
//! sink backends report through.
//!
//! ## Architecture
//!
//! The session layer treats every native player technology as a
//! [`PlayerBackend`]: a thin, interchangeable wrapper over one native player
//! instance. Concrete backends (software decoder, adaptive streaming
//! decoder, platform AV framework) live in [`crate::backends`] and translate
//! their framework's callback vocabulary into the [`BackendCallbacks`] sink.
//!
//! ## Threading Model
//!
//! Backend control methods are invoked under the owning session's exclusion
//! context and must be fast and non-blocking: `prepare` and `seek_to` are
//! acknowledgements, with completion reported later through the sink.
//! The sink itself is cheap to clone and safe to drive from any backend
//! thread (decoder thread, platform main thread, framework callback thread).

use crate::error::Result;
use async_trait::async_trait;
use core_runtime::events::BufferedRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

// ============================================================================
// Media Source Types
// ============================================================================

/// Wire-level tag for a caller-supplied locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Remote HTTP(S) stream.
    Url,
    /// Absolute path on the local filesystem.
    File,
    /// Bundled asset key, already resolved by the host's asset lookup.
    Asset,
}

/// A resolved media source, ready to hand to a backend.
///
/// Locator resolution (asset key lookup, path normalization) is the host's
/// job; the core only carries the resolved value to the backend factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Media streamed from a remote HTTP(S) endpoint.
    Url { url: String },

    /// Media file stored locally on the filesystem.
    File { path: PathBuf },

    /// Media bundled with the host application.
    Asset { key: String },
}

impl MediaSource {
    /// Builds a source from the caller's `(type, locator)` pair.
    pub fn from_parts(source_type: SourceType, locator: impl Into<String>) -> Self {
        let locator = locator.into();
        match source_type {
            SourceType::Url => MediaSource::Url { url: locator },
            SourceType::File => MediaSource::File {
                path: PathBuf::from(locator),
            },
            SourceType::Asset => MediaSource::Asset { key: locator },
        }
    }

    /// Returns `true` if this source requires network access.
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Url { .. })
    }

    /// The raw locator string, for logging.
    pub fn locator(&self) -> String {
        match self {
            MediaSource::Url { url } => url.clone(),
            MediaSource::File { path } => path.display().to_string(),
            MediaSource::Asset { key } => key.clone(),
        }
    }
}

// ============================================================================
// Backend Callback Sink
// ============================================================================

/// A normalized report from a native backend.
///
/// Internal currency between the callback sink and the owning session's
/// inbox; backends never construct these directly, they call the sink.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendSignal {
    Ready { duration_ms: i64 },
    BufferingStart,
    BufferingEnd,
    PlayingChanged { playing: bool },
    SeekComplete { finished: bool },
    Ended,
    Failed { message: String },
    BufferedRanges { ranges: Vec<BufferedRange> },
}

/// A signal tagged with the generation of the sink that produced it.
///
/// Disposal bumps the session's generation; anything tagged older is
/// dropped at delivery, which is what lets backend release be asynchronous
/// without ever leaking a post-dispose event.
#[derive(Debug, Clone)]
pub(crate) struct TaggedSignal {
    pub generation: u64,
    pub signal: BackendSignal,
}

/// The callback sink a backend drives.
///
/// Injected into the backend at construction time (no listener
/// inheritance); each concrete backend translates its framework's native
/// callback shapes into exactly this set of reports. Cloning is cheap and
/// every method is safe to call from any thread.
#[derive(Clone)]
pub struct BackendCallbacks {
    tx: mpsc::UnboundedSender<TaggedSignal>,
    generation: u64,
}

impl BackendCallbacks {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TaggedSignal>, generation: u64) -> Self {
        Self { tx, generation }
    }

    fn send(&self, signal: BackendSignal) {
        // The session may already be gone; a dead inbox is not an error.
        let _ = self.tx.send(TaggedSignal {
            generation: self.generation,
            signal,
        });
    }

    /// The backend finished preparing; the media duration is now known.
    pub fn on_ready(&self, duration_ms: i64) {
        self.send(BackendSignal::Ready { duration_ms });
    }

    /// Playback progress stalled while the backend refills its buffer.
    pub fn on_buffering_start(&self) {
        self.send(BackendSignal::BufferingStart);
    }

    /// The backend's buffer refilled; playback progress resumes.
    pub fn on_buffering_end(&self) {
        self.send(BackendSignal::BufferingEnd);
    }

    /// The backend's actual playing state changed (level-triggered truth,
    /// not an echo of the caller's last command).
    pub fn on_playing_changed(&self, playing: bool) {
        self.send(BackendSignal::PlayingChanged { playing });
    }

    /// A seek completed. `finished == false` when the native framework
    /// itself reports the seek was interrupted.
    pub fn on_seek_complete(&self, finished: bool) {
        self.send(BackendSignal::SeekComplete { finished });
    }

    /// The media played to its natural end.
    pub fn on_ended(&self) {
        self.send(BackendSignal::Ended);
    }

    /// The backend hit an unrecoverable decode/network error.
    pub fn on_error(&self, message: impl Into<String>) {
        self.send(BackendSignal::Failed {
            message: message.into(),
        });
    }

    /// Push-driven buffered-range report, for backends that publish range
    /// changes instead of exposing a pollable position.
    pub fn on_buffered_ranges(&self, ranges: Vec<BufferedRange>) {
        self.send(BackendSignal::BufferedRanges { ranges });
    }
}

impl std::fmt::Debug for BackendCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCallbacks")
            .field("generation", &self.generation)
            .finish()
    }
}

// ============================================================================
// Backend Capability Surface
// ============================================================================

/// Polymorphic wrapper over one native player instance.
///
/// One backend serves exactly one session for that session's lifetime and
/// is released exactly once, on dispose or after an unrecoverable error.
///
/// ## Implementation Notes
///
/// - Control methods must not block on network or decode I/O. `prepare`
///   and `seek_to` only start the operation; completion arrives through
///   the [`BackendCallbacks`] sink.
/// - `release` must be idempotent at the native layer or guarded by the
///   implementation; the session calls it at most once.
/// - Position and duration queries should be cheap; the session reads them
///   while holding its state lock.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Begin asynchronous preparation. Readiness is reported via
    /// [`BackendCallbacks::on_ready`].
    async fn prepare(&self) -> Result<()>;

    /// Ask the backend to start or resume playback. The `Playing` event is
    /// only emitted once the backend confirms via
    /// [`BackendCallbacks::on_playing_changed`].
    async fn play(&self) -> Result<()>;

    /// Ask the backend to pause playback.
    async fn pause(&self) -> Result<()>;

    /// Begin an asynchronous seek to an absolute media position.
    async fn seek_to(&self, position_ms: i64) -> Result<()>;

    /// Current playback position in milliseconds of media time.
    async fn position_millis(&self) -> Result<i64>;

    /// Total media duration in milliseconds, once known.
    async fn duration_millis(&self) -> Result<i64>;

    /// Snapshot of the currently buffered media-time intervals.
    async fn buffered_ranges(&self) -> Result<Vec<BufferedRange>>;

    /// Release the native player instance.
    async fn release(&self) -> Result<()>;

    /// `true` if this backend pushes buffered-range changes through
    /// [`BackendCallbacks::on_buffered_ranges`]; `false` if the session
    /// must poll [`PlayerBackend::buffered_ranges`] on an interval.
    fn pushes_buffered_ranges(&self) -> bool {
        false
    }
}

/// Creates one backend per session, chosen by the caller at `create` time.
///
/// The factory is where source resolution failures surface: a bad locator
/// or unreadable asset makes `create` fail, which the session turns into an
/// `Error` event (never a command failure).
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(
        &self,
        source: &MediaSource,
        callbacks: BackendCallbacks,
    ) -> Result<Arc<dyn PlayerBackend>>;
}

// ============================================================================
// Tests
// ============================================================================
