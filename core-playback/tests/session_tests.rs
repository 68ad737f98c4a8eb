//! Integration tests for the playback session state machine, driven
//! through the registry with a scripted in-memory backend.

use async_trait::async_trait;
use core_playback::registry::SessionRegistry;
use core_playback::session::SessionPhase;
use core_playback::traits::{
    BackendCallbacks, BackendFactory, MediaSource, PlayerBackend, SourceType,
};
use core_playback::{PlaybackError, Result};
use core_runtime::config::PlayerConfig;
use core_runtime::events::{BufferedRange, PlayerEvent, PlayerEventKind};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

// ============================================================================
// Scripted backend harness
// ============================================================================

#[derive(Clone)]
struct Script {
    duration_ms: i64,
    /// Report readiness synchronously from `prepare`.
    ready_on_prepare: bool,
    /// Confirm every seek synchronously from `seek_to`.
    complete_seeks: bool,
    fail_prepare: Option<&'static str>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            duration_ms: 120_000,
            ready_on_prepare: true,
            complete_seeks: true,
            fail_prepare: None,
        }
    }
}

struct ScriptedBackend {
    callbacks: BackendCallbacks,
    script: Script,
    position_ms: AtomicI64,
    buffered_ms: AtomicI64,
    released: AtomicBool,
}

impl ScriptedBackend {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerBackend for ScriptedBackend {
    async fn prepare(&self) -> Result<()> {
        if let Some(message) = self.script.fail_prepare {
            return Err(PlaybackError::BackendFailure(message.to_string()));
        }
        if self.script.ready_on_prepare {
            self.callbacks.on_ready(self.script.duration_ms);
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.callbacks.on_playing_changed(true);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.callbacks.on_playing_changed(false);
        Ok(())
    }

    async fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.position_ms.store(position_ms, Ordering::SeqCst);
        if self.script.complete_seeks {
            self.callbacks.on_seek_complete(true);
        }
        Ok(())
    }

    async fn position_millis(&self) -> Result<i64> {
        Ok(self.position_ms.load(Ordering::SeqCst))
    }

    async fn duration_millis(&self) -> Result<i64> {
        Ok(self.script.duration_ms)
    }

    async fn buffered_ranges(&self) -> Result<Vec<BufferedRange>> {
        let watermark = self.buffered_ms.load(Ordering::SeqCst);
        if watermark > 0 {
            Ok(vec![BufferedRange::new(0, watermark)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn release(&self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds one scripted backend per session and keeps a handle so tests can
/// drive native-side callbacks directly.
struct ScriptedFactory {
    script: Script,
    fail_create: Option<&'static str>,
    last: Mutex<Option<Arc<ScriptedBackend>>>,
}

impl ScriptedFactory {
    fn new(script: Script) -> Self {
        Self {
            script,
            fail_create: None,
            last: Mutex::new(None),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            script: Script::default(),
            fail_create: Some(message),
            last: Mutex::new(None),
        }
    }

    fn last_backend(&self) -> Arc<ScriptedBackend> {
        self.last
            .lock()
            .unwrap()
            .clone()
            .expect("no backend created yet")
    }
}

#[async_trait]
impl BackendFactory for ScriptedFactory {
    async fn create(
        &self,
        _source: &MediaSource,
        callbacks: BackendCallbacks,
    ) -> Result<Arc<dyn PlayerBackend>> {
        if let Some(message) = self.fail_create {
            return Err(PlaybackError::SourceResolutionFailed(message.to_string()));
        }
        let backend = Arc::new(ScriptedBackend {
            callbacks,
            script: self.script.clone(),
            position_ms: AtomicI64::new(0),
            buffered_ms: AtomicI64::new(0),
            released: AtomicBool::new(false),
        });
        *self.last.lock().unwrap() = Some(Arc::clone(&backend));
        Ok(backend)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn source() -> MediaSource {
    MediaSource::from_parts(SourceType::Url, "http://example.com/track.mp3")
}

fn default_registry() -> SessionRegistry {
    SessionRegistry::new(PlayerConfig::default())
}

fn create_player(
    registry: &SessionRegistry,
    factory: &Arc<ScriptedFactory>,
    id: &str,
) -> Result<()> {
    registry.create(id, source(), Arc::clone(factory) as Arc<dyn BackendFactory>)
}

async fn next_event(rx: &mut broadcast::Receiver<PlayerEvent>) -> PlayerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

async fn assert_silent(rx: &mut broadcast::Receiver<PlayerEvent>) {
    let outcome = timeout(Duration::from_millis(150), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected event: {:?}", outcome);
}

/// Drives a session to `Prepared`, consuming the two lifecycle events.
async fn prepared_session(
    registry: &SessionRegistry,
    factory: &Arc<ScriptedFactory>,
    rx: &mut broadcast::Receiver<PlayerEvent>,
    id: &str,
) {
    create_player(registry, factory, id).unwrap();
    assert_eq!(next_event(rx).await.kind, PlayerEventKind::Preparing);
    assert_eq!(
        next_event(rx).await.kind,
        PlayerEventKind::Prepared {
            duration_ms: 120_000
        }
    );
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn preparation_emits_preparing_then_prepared() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();

    create_player(&registry, &factory, "p1").unwrap();

    let first = next_event(&mut rx).await;
    assert_eq!(first.player_id, "p1");
    assert_eq!(first.kind, PlayerEventKind::Preparing);
    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Prepared {
            duration_ms: 120_000
        }
    );

    let snapshot = registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Prepared);
    assert_eq!(snapshot.duration_ms, Some(120_000));
}

#[tokio::test]
async fn play_before_prepared_is_a_silent_no_op() {
    let factory = Arc::new(ScriptedFactory::new(Script {
        ready_on_prepare: false,
        ..Script::default()
    }));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();

    create_player(&registry, &factory, "p1").unwrap();
    assert_eq!(next_event(&mut rx).await.kind, PlayerEventKind::Preparing);

    // The command does not fail, it is simply dropped.
    registry.play("p1").await.unwrap();
    assert_silent(&mut rx).await;

    // Readiness arrives late; the session proceeds normally.
    factory.last_backend().callbacks.on_ready(120_000);
    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Prepared {
            duration_ms: 120_000
        }
    );
}

#[tokio::test]
async fn play_emits_playing_once_the_backend_confirms() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    registry.play("p1").await.unwrap();

    match next_event(&mut rx).await.kind {
        PlayerEventKind::Playing { position_ms, .. } => assert_eq!(position_ms, 0),
        other => panic!("expected Playing, got {other:?}"),
    }
    match next_event(&mut rx).await.kind {
        PlayerEventKind::IsPlayingChanged { playing, .. } => assert!(playing),
        other => panic!("expected IsPlayingChanged, got {other:?}"),
    }
    assert!(registry.snapshot("p1").await.unwrap().playing);
}

#[tokio::test]
async fn pause_is_ignored_unless_the_backend_is_playing() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    registry.pause("p1").await.unwrap();
    assert_silent(&mut rx).await;

    registry.play("p1").await.unwrap();
    let _ = next_event(&mut rx).await; // Playing
    let _ = next_event(&mut rx).await; // IsPlayingChanged

    registry.pause("p1").await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Paused { .. }
    ));
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::IsPlayingChanged { playing: false, .. }
    ));
}

#[tokio::test]
async fn seek_emits_seeking_then_seek_finished() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    registry.seek("p1", 5000).await.unwrap();

    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Seeking { target_ms: 5000 }
    );
    match next_event(&mut rx).await.kind {
        PlayerEventKind::SeekFinished {
            position_ms,
            finished,
            ..
        } => {
            assert_eq!(position_ms, 5000);
            assert!(finished);
        }
        other => panic!("expected SeekFinished, got {other:?}"),
    }
}

#[tokio::test]
async fn rapid_seeks_mark_the_superseded_one_unfinished() {
    let factory = Arc::new(ScriptedFactory::new(Script {
        complete_seeks: false,
        ..Script::default()
    }));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    registry.seek("p1", 5000).await.unwrap();
    registry.seek("p1", 9000).await.unwrap();
    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Seeking { target_ms: 5000 }
    );
    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Seeking { target_ms: 9000 }
    );

    // The backend confirms both seeks, in order.
    let backend = factory.last_backend();
    backend.callbacks.on_seek_complete(true);
    backend.callbacks.on_seek_complete(true);

    match next_event(&mut rx).await.kind {
        PlayerEventKind::SeekFinished { finished, .. } => assert!(!finished),
        other => panic!("expected superseded SeekFinished, got {other:?}"),
    }
    match next_event(&mut rx).await.kind {
        PlayerEventKind::SeekFinished {
            position_ms,
            finished,
            ..
        } => {
            assert_eq!(position_ms, 9000);
            assert!(finished);
        }
        other => panic!("expected final SeekFinished, got {other:?}"),
    }
}

#[tokio::test]
async fn seek_out_of_ended_replays_a_buffering_pair() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    factory.last_backend().callbacks.on_ended();
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::End { .. }
    ));
    assert_eq!(
        registry.snapshot("p1").await.unwrap().phase,
        SessionPhase::Ended
    );

    registry.seek("p1", 0).await.unwrap();

    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Seeking { target_ms: 0 }
    );
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::SeekFinished { finished: true, .. }
    ));
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Buffering { .. }
    ));
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::BufferingEnd { .. }
    ));
    assert_eq!(
        registry.snapshot("p1").await.unwrap().phase,
        SessionPhase::Prepared
    );
}

#[tokio::test]
async fn backend_failure_emits_error_and_releases_the_backend() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    let backend = factory.last_backend();
    backend.callbacks.on_error("decoder choked");

    match next_event(&mut rx).await.kind {
        PlayerEventKind::Error { message } => assert_eq!(message, "decoder choked"),
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(backend.is_released());
    assert_eq!(
        registry.snapshot("p1").await.unwrap().phase,
        SessionPhase::Error
    );

    // The session is inert but still addressable.
    registry.play("p1").await.unwrap();
    assert_silent(&mut rx).await;
    registry.dispose("p1").await.unwrap();
}

#[tokio::test]
async fn source_resolution_failure_surfaces_as_an_error_event() {
    let factory = Arc::new(ScriptedFactory::failing("no such asset"));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();

    // Creation itself succeeds; the failure is asynchronous.
    create_player(&registry, &factory, "p1").unwrap();

    assert_eq!(next_event(&mut rx).await.kind, PlayerEventKind::Preparing);
    assert!(matches!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::Error { .. }
    ));
    assert_eq!(
        registry.snapshot("p1").await.unwrap().phase,
        SessionPhase::Error
    );
}

#[tokio::test]
async fn prepare_failure_surfaces_as_an_error_event() {
    let factory = Arc::new(ScriptedFactory::new(Script {
        fail_prepare: Some("container not supported"),
        ..Script::default()
    }));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();

    create_player(&registry, &factory, "p1").unwrap();

    assert_eq!(next_event(&mut rx).await.kind, PlayerEventKind::Preparing);
    match next_event(&mut rx).await.kind {
        PlayerEventKind::Error { message } => {
            assert!(message.contains("container not supported"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn dispose_silences_callbacks_already_in_flight() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let registry = default_registry();
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    let backend = factory.last_backend();
    registry.dispose("p1").await.unwrap();
    assert!(backend.is_released());
    assert_eq!(registry.live_count(), 0);

    // A backend thread that has not observed the teardown yet.
    backend.callbacks.on_playing_changed(true);
    backend.callbacks.on_ended();
    backend.callbacks.on_error("late failure");
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn buffered_ranges_are_polled_and_deduplicated() {
    let factory = Arc::new(ScriptedFactory::new(Script::default()));
    let config = PlayerConfig::builder()
        .buffer_poll_interval(Duration::from_millis(20))
        .build()
        .unwrap();
    let registry = SessionRegistry::new(config);
    let mut rx = registry.bus().subscribe();
    prepared_session(&registry, &factory, &mut rx, "p1").await;

    let backend = factory.last_backend();
    backend.buffered_ms.store(30_000, Ordering::SeqCst);

    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::UpdateBufferPosition {
            ranges: vec![BufferedRange::new(0, 30_000)]
        }
    );
    // Several more poll ticks with the same watermark: nothing.
    assert_silent(&mut rx).await;

    backend.buffered_ms.store(60_000, Ordering::SeqCst);
    assert_eq!(
        next_event(&mut rx).await.kind,
        PlayerEventKind::UpdateBufferPosition {
            ranges: vec![BufferedRange::new(0, 60_000)]
        }
    );
}
