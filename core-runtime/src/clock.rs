//! # Monotonic Event Clock
//!
//! Every position-bearing playback event carries an `update_time_ms` taken
//! from this single monotonic source, so callers can extrapolate position
//! linearly between events while playback is active. The reading is
//! uptime-style (anchored at first use), never wall-clock, so it is immune
//! to NTP adjustments and timezone changes.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since the clock was first read in this process.
///
/// Monotonically non-decreasing. The absolute value is meaningless on its
/// own; only differences between two readings are.
pub fn uptime_millis() -> i64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as i64
}
