//! Integration test: frame statistics
//!
//! Verifies ring semantics (zero sentinels, wraparound, recent-window
//! ordering) and the per-sampling-period fps aggregation of the tracker.
//!
//! Run with: cargo test --test stats_test -- --nocapture

use glimpse_core::stats::{FrameStatRing, FrameTimingTracker, RING_CAPACITY};

#[test]
fn test_ring_starts_empty() {
    let ring = FrameStatRing::new();
    if ring.frames() != 0 {
        panic!("expected 0 frames, got {}", ring.frames());
    }
    if ring.latest() != 0 {
        panic!("expected 0 latest, got {}", ring.latest());
    }
    let recent = ring.recent(4);
    if recent != vec![0, 0, 0, 0] {
        panic!("expected zero sentinels, got {:?}", recent);
    }
}

#[test]
fn test_first_frame_records_zero_sentinel() {
    let mut ring = FrameStatRing::new();
    // No prior present to measure against.
    ring.push(None);
    ring.push(Some(16_000));

    if ring.frames() != 2 {
        panic!("expected 2 frames, got {}", ring.frames());
    }
    let recent = ring.recent(2);
    if recent != vec![0, 16_000] {
        panic!("expected [0, 16000], got {:?}", recent);
    }
}

#[test]
fn test_recent_is_oldest_first() {
    let mut ring = FrameStatRing::new();
    for i in 1..=5u64 {
        ring.push(Some(i * 1000));
    }
    let recent = ring.recent(3);
    if recent != vec![3000, 4000, 5000] {
        panic!("expected [3000, 4000, 5000], got {:?}", recent);
    }
    if ring.latest() != 5000 {
        panic!("expected latest 5000, got {}", ring.latest());
    }
}

#[test]
fn test_ring_wraparound_overwrites_in_place() {
    let mut ring = FrameStatRing::new();
    for i in 0..(RING_CAPACITY as u64 + 3) {
        ring.push(Some(i));
    }
    if ring.frames() != RING_CAPACITY as u64 + 3 {
        panic!("expected {} frames, got {}", RING_CAPACITY + 3, ring.frames());
    }
    // The newest sample landed on a recycled slot.
    if ring.latest() != RING_CAPACITY as u64 + 2 {
        panic!("expected latest {}, got {}", RING_CAPACITY + 2, ring.latest());
    }
    let recent = ring.recent(RING_CAPACITY);
    if recent.len() != RING_CAPACITY {
        panic!("expected a full window, got {} samples", recent.len());
    }
    if recent[0] != 3 {
        panic!("expected oldest surviving sample 3, got {}", recent[0]);
    }
}

#[test]
fn test_recent_never_exceeds_capacity() {
    let ring = FrameStatRing::new();
    let recent = ring.recent(RING_CAPACITY * 2);
    if recent.len() != RING_CAPACITY {
        panic!("expected window clamped to {}, got {}", RING_CAPACITY, recent.len());
    }
}

#[test]
fn test_tracker_first_tick_has_no_frame_time() {
    let mut tracker = FrameTimingTracker::new();
    let tick = tracker.tick(1_000, 500_000);
    if tick.frame_time_us.is_some() {
        panic!("expected no frame time on the first tick, got {:?}", tick.frame_time_us);
    }
    if tick.sampling_period_elapsed {
        panic!("expected no sampling period on the first tick");
    }
    if tracker.frame_count() != 1 {
        panic!("expected frame_count 1, got {}", tracker.frame_count());
    }
}

#[test]
fn test_tracker_measures_present_intervals() {
    let mut tracker = FrameTimingTracker::new();
    tracker.tick(1_000, 500_000);
    let tick = tracker.tick(17_500, 500_000);
    match tick.frame_time_us {
        Some(16_500) => {}
        other => panic!("expected Some(16500), got {:?}", other),
    }
}

#[test]
fn test_fps_commits_once_per_sampling_period() {
    let mut tracker = FrameTimingTracker::new();
    let period = 500_000u64;

    // 60 fps cadence: one frame every 16_667 us.
    let mut now = 0u64;
    let mut committed_at = None;
    for frame in 0..64u64 {
        now += 16_667;
        let tick = tracker.tick(now, period);
        if tick.sampling_period_elapsed && committed_at.is_none() {
            committed_at = Some(frame);
        }
    }

    let committed_at = match committed_at {
        Some(f) => f,
        None => panic!("expected the sampling period to elapse within 64 frames"),
    };
    // 500_000 / 16_667 is just under 30 frames.
    if !(28..=32).contains(&committed_at) {
        panic!("expected the period to elapse near frame 30, got {}", committed_at);
    }

    let fps = tracker.fps();
    if !(58.0..=62.0).contains(&fps) {
        panic!("expected roughly 60 fps, got {}", fps);
    }
}

#[test]
fn test_fps_is_zero_before_first_commit() {
    let mut tracker = FrameTimingTracker::new();
    tracker.tick(1_000, 500_000);
    tracker.tick(17_000, 500_000);
    if tracker.fps() != 0.0 {
        panic!("expected fps 0.0 before the first period, got {}", tracker.fps());
    }
}
