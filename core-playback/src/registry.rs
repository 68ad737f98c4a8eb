//! # Session Registry
//!
//! The single control surface hosts talk to: a map from caller-chosen
//! player ids to live [`PlaybackSession`]s, plus id-addressed dispatch of
//! playback commands.
//!
//! The map itself is guarded by a synchronous `parking_lot::Mutex` that is
//! never held across an await; commands clone the session handle out of
//! the map and then drive it, so slow backends on one id never block
//! control traffic for another.

use crate::error::{PlaybackError, Result};
use crate::session::{PlaybackSession, SessionSnapshot};
use crate::traits::{BackendFactory, MediaSource};
use core_runtime::config::PlayerConfig;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// An id-addressed playback command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Seek { position_ms: i64 },
    Dispose,
}

/// Owns every live session and routes commands to them by id.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<PlaybackSession>>>,
    bus: EventBus,
    config: PlayerConfig,
}

impl SessionRegistry {
    pub fn new(config: PlayerConfig) -> Self {
        let bus = EventBus::new(config.event_buffer_size);
        Self {
            sessions: Mutex::new(HashMap::new()),
            bus,
            config,
        }
    }

    /// The normalized event stream all sessions publish to.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Creates a session under `id` and starts preparing it with a backend
    /// built by `factory`.
    ///
    /// Fails with [`PlaybackError::AlreadyExists`] if the id is taken; an
    /// id freed by `dispose` is immediately reusable.
    #[instrument(skip(self, source, factory), fields(locator = %source.locator()))]
    pub fn create(
        &self,
        id: &str,
        source: MediaSource,
        factory: Arc<dyn BackendFactory>,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(id) {
            return Err(PlaybackError::AlreadyExists(id.to_string()));
        }
        let session = PlaybackSession::spawn(
            id.to_string(),
            source,
            factory,
            self.bus.clone(),
            self.config.clone(),
        );
        sessions.insert(id.to_string(), session);
        Ok(())
    }

    /// Routes a command to the session registered under `id`.
    ///
    /// `Dispose` removes the id from the map before tearing the session
    /// down, so the id is free for `create` the moment this returns.
    #[instrument(skip(self))]
    pub async fn command(&self, id: &str, command: PlayerCommand) -> Result<()> {
        let session = match command {
            PlayerCommand::Dispose => self.sessions.lock().remove(id),
            _ => self.sessions.lock().get(id).cloned(),
        }
        .ok_or_else(|| PlaybackError::NotFound(id.to_string()))?;

        match command {
            PlayerCommand::Play => session.play().await,
            PlayerCommand::Pause => session.pause().await,
            PlayerCommand::Seek { position_ms } => session.seek(position_ms).await,
            PlayerCommand::Dispose => session.dispose().await,
        }
        Ok(())
    }

    pub async fn play(&self, id: &str) -> Result<()> {
        self.command(id, PlayerCommand::Play).await
    }

    pub async fn pause(&self, id: &str) -> Result<()> {
        self.command(id, PlayerCommand::Pause).await
    }

    pub async fn seek(&self, id: &str, position_ms: i64) -> Result<()> {
        self.command(id, PlayerCommand::Seek { position_ms }).await
    }

    pub async fn dispose(&self, id: &str) -> Result<()> {
        self.command(id, PlayerCommand::Dispose).await
    }

    /// Host (re)attachment hook: tears down anything left over from a
    /// previous engine instance. Equivalent to [`SessionRegistry::reset_all`].
    pub async fn initialize(&self) {
        self.reset_all().await;
    }

    /// Disposes every live session and empties the registry.
    ///
    /// All ids are free again once this returns; a `create` racing this
    /// can never attach to a session that is mid-teardown.
    pub async fn reset_all(&self) {
        let drained: Vec<Arc<PlaybackSession>> = {
            let mut sessions = self.sessions.lock();
            sessions.drain().map(|(_, session)| session).collect()
        };
        if !drained.is_empty() {
            info!(count = drained.len(), "resetting all playback sessions");
        }
        for session in drained {
            session.dispose().await;
        }
    }

    /// Snapshot of the session registered under `id`, if any.
    pub async fn snapshot(&self, id: &str) -> Option<SessionSnapshot> {
        let session = self.sessions.lock().get(id).cloned()?;
        Some(session.snapshot().await)
    }

    /// Number of live (not yet disposed) sessions.
    pub fn live_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("live_count", &self.live_count())
            .finish()
    }
}
