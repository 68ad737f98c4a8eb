//! # Backend Shims
//!
//! Adapters from three native player surfaces onto the uniform
//! [`PlayerBackend`](crate::traits::PlayerBackend) interface. Each shim
//! converts one framework's raw notice vocabulary into normalized
//! [`BackendCallbacks`](crate::traits::BackendCallbacks) signals and
//! absorbs that framework's quirks so sessions never see them.
//!
//! | Shim | Native model | Range reporting |
//! |------|--------------|-----------------|
//! | [`software`] | single-track decoder with prepare/info notices | polled watermark |
//! | [`adaptive`] | buffered stream state machine with play-when-ready | pushed |
//! | [`platform`] | OS AV item with time-control status | pushed |

pub mod adaptive;
pub mod platform;
pub mod software;

pub use adaptive::{AdaptiveStreamBackend, AdaptiveStreamDriver, AdaptiveStreamNotice, StreamState};
pub use platform::{
    AvItemStatus, PlatformAvBackend, PlatformAvDriver, PlatformAvNotice, TimeControlStatus,
};
pub use software::{
    SoftwareDecoderBackend, SoftwareDecoderDriver, SoftwareDecoderNotice, SoftwareInfoCode,
};
