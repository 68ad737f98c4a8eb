//! # Playback Session Usage Example
//!
//! Demonstrates the host-facing flow: plug a backend factory into the
//! registry, create a session, drive it with commands, and watch the
//! normalized event stream.
//!
//! The backend here is a scripted in-memory stand-in for a native player;
//! a real host would wrap its platform's player the way the shims in
//! `core_playback::backends` do.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use async_trait::async_trait;
use core_playback::registry::SessionRegistry;
use core_playback::traits::{
    BackendCallbacks, BackendFactory, MediaSource, PlayerBackend, SourceType,
};
use core_playback::Result;
use core_runtime::config::PlayerConfig;
use core_runtime::events::BufferedRange;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// A scripted stand-in for a native player
// ============================================================================

struct DemoBackend {
    callbacks: BackendCallbacks,
    position_ms: AtomicI64,
}

#[async_trait]
impl PlayerBackend for DemoBackend {
    async fn prepare(&self) -> Result<()> {
        // A native backend would start decoding here and report readiness
        // later; the demo is ready immediately.
        self.callbacks.on_ready(30_000);
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
        self.callbacks.on_seek_complete(true);
        Ok(())
    }

    async fn position_millis(&self) -> Result<i64> {
        Ok(self.position_ms.load(Ordering::SeqCst))
    }

    async fn duration_millis(&self) -> Result<i64> {
        Ok(30_000)
    }

    async fn buffered_ranges(&self) -> Result<Vec<BufferedRange>> {
        Ok(vec![BufferedRange::new(0, 30_000)])
    }

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

struct DemoFactory;

#[async_trait]
impl BackendFactory for DemoFactory {
    async fn create(
        &self,
        source: &MediaSource,
        callbacks: BackendCallbacks,
    ) -> Result<Arc<dyn PlayerBackend>> {
        println!("factory: resolving {}", source.locator());
        Ok(Arc::new(DemoBackend {
            callbacks,
            position_ms: AtomicI64::new(0),
        }))
    }
}

// ============================================================================
// Host flow
// ============================================================================

#[tokio::main]
async fn main() {
    let registry = SessionRegistry::new(PlayerConfig::default());

    // Subscribe before creating so no lifecycle event is missed.
    let mut events = registry.bus().subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("[{}] {}", event.player_id, event.kind.description());
        }
    });

    registry
        .create(
            "demo",
            MediaSource::from_parts(SourceType::Url, "https://example.com/track.mp3"),
            Arc::new(DemoFactory),
        )
        .expect("id is free");

    registry.play("demo").await.expect("session exists");
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.seek("demo", 12_000).await.expect("session exists");
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.pause("demo").await.expect("session exists");
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.dispose("demo").await.expect("session exists");
    drop(registry);
    let _ = printer.await;
}
