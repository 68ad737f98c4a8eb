//! # Buffered-Range Tracking
//!
//! Derives deduplicated buffered-interval updates from raw backend reports.
//!
//! Backends come in two shapes: those that push range changes (the session
//! routes their reports straight through [`BufferRangeTracker::offer`]) and
//! those that only expose a pollable buffered position (the session polls
//! them on `PlayerConfig::buffer_poll_interval` and feeds the snapshots
//! through the same path). Either way the invariant is the same: identical
//! consecutive snapshots are never emitted.

use core_runtime::events::BufferedRange;

/// Tracks the last emitted buffered-range snapshot for one session.
#[derive(Debug, Default)]
pub struct BufferRangeTracker {
    last_emitted: Option<Vec<BufferedRange>>,
}

impl BufferRangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a raw snapshot from the backend.
    ///
    /// Returns `Some(normalized)` when the snapshot differs from the last
    /// emitted one, `None` when it would be a duplicate. Raw ranges are
    /// normalized first: sorted by start, adjacent/overlapping intervals
    /// merged, empty intervals dropped.
    pub fn offer(&mut self, raw: Vec<BufferedRange>) -> Option<Vec<BufferedRange>> {
        let normalized = normalize(raw);
        if self.last_emitted.as_ref() == Some(&normalized) {
            return None;
        }
        // Nothing buffered yet is not a report worth making.
        if normalized.is_empty() && self.last_emitted.is_none() {
            return None;
        }
        self.last_emitted = Some(normalized.clone());
        Some(normalized)
    }

    /// The last snapshot handed out, if any.
    pub fn last(&self) -> Option<&[BufferedRange]> {
        self.last_emitted.as_deref()
    }
}

/// Sorts, merges, and drops degenerate intervals.
fn normalize(mut ranges: Vec<BufferedRange>) -> Vec<BufferedRange> {
    ranges.retain(|r| r.end_ms > r.start_ms);
    ranges.sort_by_key(|r| (r.start_ms, r.end_ms));

    let mut merged: Vec<BufferedRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(prev) if range.start_ms <= prev.end_ms => {
                prev.end_ms = prev.end_ms.max(range.end_ms);
            }
            _ => merged.push(range),
        }
    }
    merged
}
