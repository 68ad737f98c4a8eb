//! # Playback Session State Machine
//!
//! One [`PlaybackSession`] per logical player: it owns exactly one backend,
//! drives it through commands, consumes its native callbacks, and emits the
//! normalized event stream.
//!
//! ## State model
//!
//! `Preparing → {Prepared, Error}`; from `Prepared`, play/pause intent is
//! tracked level-triggered from backend confirmations, with `Buffering` as
//! an orthogonal sub-state and `Seeking → SeekFinished` as a transient
//! excursion. `Ended` and `Error` are terminal for playback progress but
//! the session stays addressable until disposed. `Destroyed` is final.
//!
//! ## Concurrency
//!
//! Commands arrive serialized on the caller's control context; backend
//! callbacks arrive on backend-owned threads. Both funnel through one
//! `tokio::sync::Mutex<SessionState>` per session: commands lock it
//! directly, callbacks are pumped out of an unbounded inbox by a
//! per-session task and applied under the same lock. Sessions never
//! coordinate with each other.
//!
//! Disposal bumps the session's generation under the lock, so callbacks
//! still in flight on a backend thread are dropped at delivery; once
//! `dispose` returns, no event for this id is ever emitted again.

use crate::buffer::BufferRangeTracker;
use crate::traits::{
    BackendCallbacks, BackendFactory, BackendSignal, MediaSource, PlayerBackend, TaggedSignal,
};
use core_runtime::clock;
use core_runtime::config::PlayerConfig;
use core_runtime::events::{EventBus, PlayerEvent, PlayerEventKind};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle phase of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Backend factory and `prepare` still running.
    Preparing,
    /// Ready; playback commands are accepted.
    Prepared,
    /// Media played to its natural end; a seek re-enters `Prepared`.
    Ended,
    /// Unrecoverable failure; only `dispose` is meaningful.
    Error,
    /// Disposed. Final and irreversible.
    Destroyed,
}

/// Mutable per-session state, guarded by the session's exclusion mutex.
struct SessionState {
    phase: SessionPhase,
    backend: Option<Arc<dyn PlayerBackend>>,
    duration_ms: Option<i64>,
    last_position_ms: i64,
    /// Backend-confirmed playing state, not the caller's last command.
    playing: bool,
    buffering: bool,
    /// Seeks issued but not yet confirmed; used to flag superseded seeks.
    pending_seeks: u32,
    /// Set when a seek pulled the session out of `Ended`; once the seek
    /// lands, a buffering pair is replayed so hosts see the stream refill.
    resumed_from_ended: bool,
    /// Bumped on dispose; signals tagged with an older value are stale.
    generation: u64,
    buffer_tracker: BufferRangeTracker,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Preparing,
            backend: None,
            duration_ms: None,
            last_position_ms: 0,
            playing: false,
            buffering: false,
            pending_seeks: 0,
            resumed_from_ended: false,
            generation: 0,
            buffer_tracker: BufferRangeTracker::new(),
        }
    }

    /// Reads the backend's current position, falling back to the last known
    /// value when the backend is gone or unhappy.
    async fn current_position(&mut self) -> i64 {
        if let Some(backend) = self.backend.clone() {
            if let Ok(position) = backend.position_millis().await {
                self.last_position_ms = position;
            }
        }
        self.last_position_ms
    }
}

/// Read-only view of a session for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub duration_ms: Option<i64>,
    pub last_position_ms: i64,
    pub playing: bool,
    pub buffering: bool,
}

/// The state machine for one player instance.
pub struct PlaybackSession {
    id: String,
    bus: EventBus,
    config: PlayerConfig,
    state: Mutex<SessionState>,
    poll_cancel: CancellationToken,
}

impl PlaybackSession {
    /// Constructs a session and immediately begins asynchronous
    /// preparation. Emits `Preparing` before returning.
    ///
    /// Must be called within a Tokio runtime: the inbox pump and the
    /// preparation task are spawned here.
    pub fn spawn(
        id: String,
        source: MediaSource,
        factory: Arc<dyn BackendFactory>,
        bus: EventBus,
        config: PlayerConfig,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            id,
            bus,
            config,
            state: Mutex::new(SessionState::new()),
            poll_cancel: CancellationToken::new(),
        });

        info!(player_id = %session.id, locator = %source.locator(), "creating playback session");
        session.emit(PlayerEventKind::Preparing);

        tokio::spawn(pump(Arc::clone(&session), rx));
        tokio::spawn({
            let session = Arc::clone(&session);
            async move {
                session.prepare_backend(source, factory, tx).await;
            }
        });

        session
    }

    /// The caller-chosen id this session answers to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current read-only view of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let st = self.state.lock().await;
        SessionSnapshot {
            phase: st.phase,
            duration_ms: st.duration_ms,
            last_position_ms: st.last_position_ms,
            playing: st.playing,
            buffering: st.buffering,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Asks the backend to start playback.
    ///
    /// No-op unless prepared; the `Playing` event is only emitted once the
    /// backend confirms it is actually progressing.
    pub async fn play(&self) {
        let mut st = self.state.lock().await;
        if st.phase != SessionPhase::Prepared {
            debug!(player_id = %self.id, phase = ?st.phase, "play ignored");
            return;
        }
        let Some(backend) = st.backend.clone() else {
            return;
        };
        if let Err(e) = backend.play().await {
            self.fail_locked(&mut st, e.to_string()).await;
        }
    }

    /// Asks the backend to pause playback.
    ///
    /// No-op unless the backend currently reports it is playing.
    pub async fn pause(&self) {
        let mut st = self.state.lock().await;
        if st.phase != SessionPhase::Prepared || !st.playing {
            debug!(player_id = %self.id, phase = ?st.phase, playing = st.playing, "pause ignored");
            return;
        }
        let Some(backend) = st.backend.clone() else {
            return;
        };
        if let Err(e) = backend.pause().await {
            self.fail_locked(&mut st, e.to_string()).await;
        }
    }

    /// Starts an asynchronous seek.
    ///
    /// Emits `Seeking` optimistically; completion arrives later as
    /// `SeekFinished`, with `finished == false` if a newer seek supersedes
    /// this one first. A seek from `Ended` re-enters `Prepared`.
    pub async fn seek(&self, target_ms: i64) {
        let mut st = self.state.lock().await;
        match st.phase {
            SessionPhase::Prepared => {}
            SessionPhase::Ended => {
                st.phase = SessionPhase::Prepared;
                st.resumed_from_ended = true;
            }
            _ => {
                debug!(player_id = %self.id, phase = ?st.phase, "seek ignored");
                return;
            }
        }
        let Some(backend) = st.backend.clone() else {
            return;
        };

        self.emit(PlayerEventKind::Seeking { target_ms });
        st.pending_seeks += 1;

        if let Err(e) = backend.seek_to(target_ms).await {
            st.pending_seeks -= 1;
            self.fail_locked(&mut st, e.to_string()).await;
        }
    }

    /// Releases the backend and silences the session permanently.
    ///
    /// Safe to call more than once. After this returns, no event for this
    /// id is ever emitted again, including callbacks already in flight on
    /// a backend thread.
    pub async fn dispose(&self) {
        let mut st = self.state.lock().await;
        if st.phase == SessionPhase::Destroyed {
            return;
        }
        info!(player_id = %self.id, "disposing playback session");

        // Anything on a backend thread that has not been applied yet is now stale.
        st.generation += 1;
        st.phase = SessionPhase::Destroyed;
        self.poll_cancel.cancel();

        if let Some(backend) = st.backend.take() {
            if let Err(e) = backend.release().await {
                warn!(player_id = %self.id, error = %e, "backend release failed");
            }
        }
        // The lock is held until the release finishes, so no pumped signal
        // can interleave with teardown.
    }

    // ========================================================================
    // Preparation
    // ========================================================================

    async fn prepare_backend(
        self: Arc<Self>,
        source: MediaSource,
        factory: Arc<dyn BackendFactory>,
        tx: mpsc::UnboundedSender<TaggedSignal>,
    ) {
        let callbacks = BackendCallbacks::new(tx, 0);

        let backend = match factory.create(&source, callbacks).await {
            Ok(backend) => backend,
            Err(e) => {
                let mut st = self.state.lock().await;
                self.fail_locked(&mut st, e.to_string()).await;
                return;
            }
        };

        {
            let mut st = self.state.lock().await;
            if st.phase == SessionPhase::Destroyed {
                // Disposed while the factory was still resolving the source.
                drop(st);
                if let Err(e) = backend.release().await {
                    warn!(player_id = %self.id, error = %e, "backend release failed");
                }
                return;
            }
            st.backend = Some(Arc::clone(&backend));
        }

        if let Err(e) = backend.prepare().await {
            let mut st = self.state.lock().await;
            self.fail_locked(&mut st, e.to_string()).await;
            return;
        }

        if !backend.pushes_buffered_ranges() {
            self.spawn_buffer_poller();
        }
    }

    /// Polls the backend for buffered ranges on a fixed interval, for
    /// backends without push-driven range reporting. The backend is only
    /// touched under the session lock, so the poller can never reach a
    /// disposed adapter.
    fn spawn_buffer_poller(self: &Arc<Self>) {
        let session = Arc::clone(self);
        let token = self.poll_cancel.clone();
        let interval = self.config.buffer_poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let mut st = session.state.lock().await;
                match st.phase {
                    SessionPhase::Destroyed | SessionPhase::Error => break,
                    _ => {}
                }
                let Some(backend) = st.backend.clone() else {
                    continue;
                };
                match backend.buffered_ranges().await {
                    Ok(ranges) => {
                        if let Some(changed) = st.buffer_tracker.offer(ranges) {
                            session.emit(PlayerEventKind::UpdateBufferPosition { ranges: changed });
                        }
                    }
                    Err(e) => {
                        debug!(player_id = %session.id, error = %e, "buffered range poll failed");
                    }
                }
            }
        });
    }

    // ========================================================================
    // Backend signal application
    // ========================================================================

    async fn apply(&self, tagged: TaggedSignal) {
        let mut st = self.state.lock().await;

        if st.phase == SessionPhase::Destroyed || tagged.generation != st.generation {
            debug!(player_id = %self.id, "dropping stale backend signal");
            return;
        }
        if st.phase == SessionPhase::Error {
            // The session is inert; the backend is already released.
            return;
        }

        match tagged.signal {
            BackendSignal::Ready { duration_ms } => {
                if st.phase == SessionPhase::Preparing {
                    st.phase = SessionPhase::Prepared;
                    st.duration_ms = Some(duration_ms);
                    self.emit(PlayerEventKind::Prepared { duration_ms });
                } else if st.buffering {
                    // Some frameworks conflate "buffer refilled" with
                    // "ready"; tolerate the raw form here as well.
                    st.buffering = false;
                    let position_ms = st.current_position().await;
                    self.emit(PlayerEventKind::BufferingEnd {
                        position_ms,
                        update_time_ms: clock::uptime_millis(),
                    });
                }
            }
            BackendSignal::BufferingStart => {
                if !st.buffering {
                    st.buffering = true;
                    let position_ms = st.current_position().await;
                    self.emit(PlayerEventKind::Buffering {
                        position_ms,
                        update_time_ms: clock::uptime_millis(),
                    });
                }
            }
            BackendSignal::BufferingEnd => {
                if st.buffering {
                    st.buffering = false;
                    let position_ms = st.current_position().await;
                    self.emit(PlayerEventKind::BufferingEnd {
                        position_ms,
                        update_time_ms: clock::uptime_millis(),
                    });
                }
            }
            BackendSignal::PlayingChanged { playing } => {
                // Level-triggered on backend truth: if a pause command and a
                // playing confirmation raced, whatever the backend reports
                // last wins.
                st.playing = playing;
                let position_ms = st.current_position().await;
                let update_time_ms = clock::uptime_millis();
                if playing {
                    self.emit(PlayerEventKind::Playing {
                        position_ms,
                        update_time_ms,
                    });
                } else {
                    self.emit(PlayerEventKind::Paused {
                        position_ms,
                        update_time_ms,
                    });
                }
                self.emit(PlayerEventKind::IsPlayingChanged {
                    playing,
                    position_ms,
                    update_time_ms,
                });
            }
            BackendSignal::SeekComplete { finished } => {
                if st.pending_seeks > 0 {
                    st.pending_seeks -= 1;
                }
                let superseded = st.pending_seeks > 0;
                let position_ms = st.current_position().await;
                self.emit(PlayerEventKind::SeekFinished {
                    position_ms,
                    update_time_ms: clock::uptime_millis(),
                    finished: finished && !superseded,
                });

                if st.resumed_from_ended && st.pending_seeks == 0 {
                    st.resumed_from_ended = false;
                    let update_time_ms = clock::uptime_millis();
                    self.emit(PlayerEventKind::Buffering {
                        position_ms,
                        update_time_ms,
                    });
                    self.emit(PlayerEventKind::BufferingEnd {
                        position_ms,
                        update_time_ms,
                    });
                }
            }
            BackendSignal::Ended => {
                st.phase = SessionPhase::Ended;
                st.playing = false;
                let position_ms = st.current_position().await;
                self.emit(PlayerEventKind::End {
                    position_ms,
                    update_time_ms: clock::uptime_millis(),
                });
            }
            BackendSignal::Failed { message } => {
                self.fail_locked(&mut st, message).await;
            }
            BackendSignal::BufferedRanges { ranges } => {
                if let Some(changed) = st.buffer_tracker.offer(ranges) {
                    self.emit(PlayerEventKind::UpdateBufferPosition { ranges: changed });
                }
            }
        }
    }

    /// Transitions to `Error`, releases the backend, and emits the `Error`
    /// event. The session stays addressable for `dispose`.
    async fn fail_locked(&self, st: &mut SessionState, message: String) {
        if matches!(st.phase, SessionPhase::Error | SessionPhase::Destroyed) {
            return;
        }
        warn!(player_id = %self.id, error = %message, "playback session failed");
        st.phase = SessionPhase::Error;
        st.playing = false;
        self.poll_cancel.cancel();

        if let Some(backend) = st.backend.take() {
            if let Err(e) = backend.release().await {
                warn!(player_id = %self.id, error = %e, "backend release failed");
            }
        }
        self.emit(PlayerEventKind::Error { message });
    }

    fn emit(&self, kind: PlayerEventKind) {
        debug!(player_id = %self.id, event = kind.description(), "emitting playback event");
        // A subscriber-less bus is not an error; nobody is listening yet.
        let _ = self.bus.emit(PlayerEvent::new(self.id.clone(), kind));
    }
}

/// Drains the session's inbox, applying each backend signal under the
/// session's exclusion lock. Exits once every callback sink is gone.
async fn pump(session: Arc<PlaybackSession>, mut rx: mpsc::UnboundedReceiver<TaggedSignal>) {
    while let Some(tagged) = rx.recv().await {
        session.apply(tagged).await;
    }
}
