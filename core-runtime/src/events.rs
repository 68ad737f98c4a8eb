//! # Playback Event Bus
//!
//! Provides the outbound event channel for the audio player core using
//! `tokio::sync::broadcast`. Every playback session publishes its normalized
//! event stream here; hosts subscribe and forward to whatever transport they
//! use (method channel, IPC, in-process callback).
//!
//! ## Overview
//!
//! - **PlayerEvent**: one notification, tagged with the session id
//! - **PlayerEventKind**: the normalized event vocabulary every backend is
//!   translated into
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: wrapper for consuming events with filtering
//!
//! ## Delivery contract
//!
//! The bus delivers events **in emission order** to each subscriber, at
//! least once per `emit` call. Slow subscribers receive
//! `RecvError::Lagged(n)` and can keep consuming newer events; `Closed`
//! signals shutdown.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlayerEvent, PlayerEventKind};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(PlayerEvent {
//!     player_id: "p1".to_string(),
//!     kind: PlayerEventKind::Preparing,
//! })
//! .ok();
//!
//! assert_eq!(sub.recv().await.unwrap().player_id, "p1");
//! # }
//! ```

use crate::config::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

// ============================================================================
// Event Types
// ============================================================================

/// A contiguous interval of media time already available for playback
/// without further network or decoder wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedRange {
    /// Start of the interval, in milliseconds of media time.
    pub start_ms: i64,
    /// End of the interval, in milliseconds of media time.
    pub end_ms: i64,
}

impl BufferedRange {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }
}

/// One playback notification delivered to the host.
///
/// Events are immutable, created at emission time; the core keeps no
/// history. `update_time_ms` fields inside the kind are readings of the
/// shared monotonic clock ([`crate::clock::uptime_millis`]), never
/// wall-clock, so hosts can extrapolate position linearly between events
/// while playback is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEvent {
    /// The session this event belongs to.
    pub player_id: String,
    /// What happened.
    #[serde(flatten)]
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    pub fn new(player_id: impl Into<String>, kind: PlayerEventKind) -> Self {
        Self {
            player_id: player_id.into(),
            kind,
        }
    }
}

/// The normalized playback event vocabulary.
///
/// Every backend's native callback shapes (status observation, info codes,
/// player-state enums) are translated into exactly this set before reaching
/// the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlayerEventKind {
    /// Session constructed, asynchronous preparation underway.
    Preparing,
    /// Backend reported ready; duration is defined from here on.
    Prepared {
        /// Total media duration in milliseconds.
        duration_ms: i64,
    },
    /// Backend confirmed playback is progressing.
    Playing {
        position_ms: i64,
        update_time_ms: i64,
    },
    /// Backend confirmed playback is paused.
    Paused {
        position_ms: i64,
        update_time_ms: i64,
    },
    /// Playback progress suspended while the backend refills its buffer.
    /// Informational only; play/pause intent is unchanged.
    Buffering {
        position_ms: i64,
        update_time_ms: i64,
    },
    /// Buffer refill finished; playback progress resumes.
    BufferingEnd {
        position_ms: i64,
        update_time_ms: i64,
    },
    /// A seek was issued; emitted optimistically before the backend confirms.
    Seeking {
        /// Requested target position in milliseconds.
        target_ms: i64,
    },
    /// A seek completed. `finished == false` means a newer seek superseded
    /// this one before the backend confirmed it; the position it carries is
    /// stale and must not be treated as authoritative.
    SeekFinished {
        position_ms: i64,
        update_time_ms: i64,
        finished: bool,
    },
    /// Natural end of the media.
    End {
        position_ms: i64,
        update_time_ms: i64,
    },
    /// Unrecoverable backend or source failure; the session stays
    /// addressable for dispose but accepts no further playback commands.
    Error {
        message: String,
    },
    /// Buffered-range snapshot changed. Ranges are ordered and
    /// non-overlapping; identical consecutive snapshots are never emitted.
    UpdateBufferPosition {
        ranges: Vec<BufferedRange>,
    },
    /// Level-triggered report of the backend's actual playing state.
    IsPlayingChanged {
        playing: bool,
        position_ms: i64,
        update_time_ms: i64,
    },
}

impl PlayerEventKind {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEventKind::Preparing => "Session preparing",
            PlayerEventKind::Prepared { .. } => "Session prepared",
            PlayerEventKind::Playing { .. } => "Playback progressing",
            PlayerEventKind::Paused { .. } => "Playback paused",
            PlayerEventKind::Buffering { .. } => "Buffering started",
            PlayerEventKind::BufferingEnd { .. } => "Buffering ended",
            PlayerEventKind::Seeking { .. } => "Seek issued",
            PlayerEventKind::SeekFinished { .. } => "Seek completed",
            PlayerEventKind::End { .. } => "Playback ended",
            PlayerEventKind::Error { .. } => "Playback error",
            PlayerEventKind::UpdateBufferPosition { .. } => "Buffered ranges changed",
            PlayerEventKind::IsPlayingChanged { .. } => "Playing state changed",
        }
    }

    /// Returns the severity level of the event for logging and filtering.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEventKind::Error { .. } => EventSeverity::Error,
            PlayerEventKind::Prepared { .. } | PlayerEventKind::End { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to playback events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Sessions treat a subscriber-less bus as a
    /// no-op rather than a failure.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive all future events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let mut one_player = EventStream::new(bus.subscribe()).for_player("p1");
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Restricts the stream to one session's events.
    pub fn for_player(self, player_id: impl Into<String>) -> Self {
        let player_id = player_id.into();
        self.filter(move |event| event.player_id == player_id)
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
