//! # Playback Error Types
//!
//! Error taxonomy for session commands and backend lifecycles.
//!
//! Command-shape errors ([`PlaybackError::AlreadyExists`],
//! [`PlaybackError::NotFound`]) are returned synchronously to the caller.
//! Lifecycle failures (source resolution, native backend errors) are never
//! command failures; they surface asynchronously as `Error` events on the
//! bus while the command that triggered them returns success. A superseded
//! seek is not an error at all; it is reported through
//! `SeekFinished { finished: false }`.

use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Session Registry Errors (synchronous, caller's bug)
    // ========================================================================
    /// `create` was called for an id that already maps to a live session.
    #[error("Player already created: {0}")]
    AlreadyExists(String),

    /// A command addressed an id with no live session.
    #[error("Player not created: {0}")]
    NotFound(String),

    // ========================================================================
    // Lifecycle Errors (asynchronous, surfaced as Error events)
    // ========================================================================
    /// The source locator could not be resolved into a playable handle.
    #[error("Failed to resolve media source: {0}")]
    SourceResolutionFailed(String),

    /// The native backend reported a decode/network failure.
    #[error("Backend failure: {0}")]
    BackendFailure(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is returned synchronously from a
    /// registry command.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::AlreadyExists(_) | PlaybackError::NotFound(_)
        )
    }

    /// Returns `true` if this error is delivered through the event stream
    /// rather than a command result.
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceResolutionFailed(_) | PlaybackError::BackendFailure(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
