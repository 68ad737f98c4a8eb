//! # Playback Module
//!
//! Multi-session playback control over heterogeneous native player
//! backends.
//!
//! ## Overview
//!
//! This module handles:
//! - The per-player [`session::PlaybackSession`] state machine
//! - The id-addressed [`registry::SessionRegistry`] control surface
//! - Normalization shims over three native backend families ([`backends`])
//! - Buffered-range dedup and merging ([`buffer`])
//!
//! Normalized events are published on the
//! [`EventBus`](core_runtime::events::EventBus) owned by the registry.

pub mod backends;
pub mod buffer;
pub mod error;
pub mod registry;
pub mod session;
pub mod traits;

pub use error::{PlaybackError, Result};
