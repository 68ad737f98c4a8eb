//! # Player Configuration Module
//!
//! Provides configuration management for the audio player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`PlayerConfig`] instance that holds the tunables shared by every
//! playback session. It enforces fail-fast validation so a misconfigured
//! host is rejected at construction time rather than at first playback.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::PlayerConfig;
//! use std::time::Duration;
//!
//! let config = PlayerConfig::builder()
//!     .event_buffer_size(256)
//!     .buffer_poll_interval(Duration::from_millis(200))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Default depth of the playback event broadcast channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Default cadence at which polled backends are asked for buffered ranges.
pub const DEFAULT_BUFFER_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shared tunables for the audio player core.
///
/// Use [`PlayerConfig::builder`] to construct instances; the builder
/// validates every field before handing the config out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Maximum number of playback events buffered per subscriber before the
    /// subscriber starts lagging.
    pub event_buffer_size: usize,

    /// Interval between buffered-range polls for backends that only expose
    /// a pollable buffered position.
    pub buffer_poll_interval: Duration,
}

impl PlayerConfig {
    /// Creates a builder for constructing a `PlayerConfig`.
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] with an actionable message if any value is
    /// out of range.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be at least 1; subscribers need a non-empty buffer"
                    .to_string(),
            ));
        }
        if self.buffer_poll_interval.is_zero() {
            return Err(Error::Config(
                "buffer_poll_interval must be non-zero; a zero interval would spin the poller"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            buffer_poll_interval: DEFAULT_BUFFER_POLL_INTERVAL,
        }
    }
}

/// Builder for [`PlayerConfig`].
#[derive(Debug, Clone, Default)]
pub struct PlayerConfigBuilder {
    event_buffer_size: Option<usize>,
    buffer_poll_interval: Option<Duration>,
}

impl PlayerConfigBuilder {
    /// Sets the event broadcast buffer depth.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the buffered-range polling interval.
    pub fn buffer_poll_interval(mut self, interval: Duration) -> Self {
        self.buffer_poll_interval = Some(interval);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn build(self) -> Result<PlayerConfig> {
        let config = PlayerConfig {
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            buffer_poll_interval: self
                .buffer_poll_interval
                .unwrap_or(DEFAULT_BUFFER_POLL_INTERVAL),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.buffer_poll_interval, DEFAULT_BUFFER_POLL_INTERVAL);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PlayerConfig::builder()
            .event_buffer_size(16)
            .buffer_poll_interval(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(config.event_buffer_size, 16);
        assert_eq!(config.buffer_poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn zero_event_buffer_is_rejected() {
        let result = PlayerConfig::builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = PlayerConfig::builder()
            .buffer_poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
