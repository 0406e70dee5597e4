//! Per-frame timing statistics.
//!
//! One `FrameStatRing` and one `FrameTimingTracker` live in each swapchain
//! context. The tracker is fed once per present from the presenting thread;
//! the ring backs the frame-time plot.

/// Fixed ring capacity. Slots are overwritten in place, never resized.
pub const RING_CAPACITY: usize = 200;

/// Circular buffer of frame-time samples (microseconds), indexed by
/// `frame_count % RING_CAPACITY`.
pub struct FrameStatRing {
    samples: [u64; RING_CAPACITY],
    frames: u64,
}

impl FrameStatRing {
    pub fn new() -> Self {
        Self { samples: [0; RING_CAPACITY], frames: 0 }
    }

    /// Record one completed frame. `frame_time_us` is `None` for the very
    /// first frame of a swapchain (no prior present to measure against);
    /// the slot is zeroed so a later wraparound read sees a sentinel, not a
    /// stale sample.
    pub fn push(&mut self, frame_time_us: Option<u64>) {
        let idx = (self.frames % RING_CAPACITY as u64) as usize;
        self.samples[idx] = frame_time_us.unwrap_or(0);
        self.frames += 1;
    }

    /// Total frames ever counted.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The most recent `k` samples, oldest first. Slots older than the
    /// first frame ever written read as zero.
    pub fn recent(&self, k: usize) -> Vec<u64> {
        let k = k.min(RING_CAPACITY);
        let mut out = Vec::with_capacity(k);
        for i in 0..k {
            let age = (k - i) as u64; // age 1 == newest
            if age > self.frames {
                out.push(0);
            } else {
                let logical = self.frames - age;
                out.push(self.samples[(logical % RING_CAPACITY as u64) as usize]);
            }
        }
        out
    }

    /// Newest sample, or 0 before any frame completed.
    pub fn latest(&self) -> u64 {
        if self.frames == 0 {
            return 0;
        }
        self.samples[((self.frames - 1) % RING_CAPACITY as u64) as usize]
    }
}

impl Default for FrameStatRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding one present into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// Interval since the previous present; `None` on the first frame.
    pub frame_time_us: Option<u64>,
    /// The sampling period elapsed on this tick; heavy telemetry reads
    /// should be kicked off (in the background) by the caller.
    pub sampling_period_elapsed: bool,
}

/// Rolling frame-rate aggregation. Fps is recomputed once per sampling
/// period from frames-since-update / elapsed, not every frame.
pub struct FrameTimingTracker {
    pub ring: FrameStatRing,
    last_present_us: u64,
    last_fps_update_us: u64,
    frames_since_update: u32,
    fps: f32,
}

impl FrameTimingTracker {
    pub fn new() -> Self {
        Self {
            ring: FrameStatRing::new(),
            last_present_us: 0,
            last_fps_update_us: 0,
            frames_since_update: 0,
            fps: 0.0,
        }
    }

    /// Feed one present at monotonic time `now_us`.
    pub fn tick(&mut self, now_us: u64, sampling_period_us: u64) -> FrameTick {
        let frame_time_us = if self.last_present_us != 0 {
            Some(now_us.saturating_sub(self.last_present_us))
        } else {
            None
        };
        self.ring.push(frame_time_us);

        let mut period_elapsed = false;
        if self.last_fps_update_us != 0 {
            let elapsed = now_us.saturating_sub(self.last_fps_update_us);
            if elapsed >= sampling_period_us && elapsed > 0 {
                self.fps = 1_000_000.0 * (self.frames_since_update + 1) as f32 / elapsed as f32;
                self.frames_since_update = 0;
                self.last_fps_update_us = now_us;
                period_elapsed = true;
            } else {
                self.frames_since_update += 1;
            }
        } else {
            self.last_fps_update_us = now_us;
        }

        self.last_present_us = now_us;

        FrameTick { frame_time_us, sampling_period_elapsed: period_elapsed }
    }

    /// Last committed fps aggregate.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Frames ever presented on this swapchain.
    pub fn frame_count(&self) -> u64 {
        self.ring.frames()
    }
}

impl Default for FrameTimingTracker {
    fn default() -> Self {
        Self::new()
    }
}
