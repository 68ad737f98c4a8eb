//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio player core:
//! - Logging and tracing infrastructure
//! - Player configuration management
//! - Playback event bus
//! - The shared monotonic clock used to timestamp events
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback core depends on.
//! It establishes the logging conventions, the configuration builder, and
//! the event broadcasting mechanism every session publishes through.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
