//! Workspace façade crate.
//!
//! Host applications that embed the audio player core can depend on
//! `apc-workspace` and reach every public surface through the re-exports
//! below instead of wiring the individual workspace crates themselves.

pub use core_playback;
pub use core_runtime;

pub use core_playback::{
    registry::{PlayerCommand, SessionRegistry},
    session::{SessionPhase, SessionSnapshot},
    traits::{BackendFactory, MediaSource, PlayerBackend, SourceType},
    PlaybackError,
};
pub use core_runtime::events::{EventBus, PlayerEvent, PlayerEventKind};
