//! Frame-rate cap via self-correcting sleep.
//!
//! After each present the pacer sleeps for whatever is left of the target
//! frame duration, minus the scheduler overhead measured on earlier frames.
//! Oversleep feeds back into the overhead estimate, converging on the OS
//! timer's real wake-up granularity without ever busy-waiting.

use glimpse_common::time::now_ns;

pub struct FramePacer {
    target_ns: i64,
    overhead_ns: i64,
    frame_end_ns: i64,
}

impl FramePacer {
    /// `target_ns <= 0` disables pacing.
    pub fn new(target_ns: i64) -> Self {
        Self { target_ns, overhead_ns: 0, frame_end_ns: 0 }
    }

    pub fn set_target(&mut self, target_ns: i64) {
        self.target_ns = target_ns;
    }

    pub fn enabled(&self) -> bool {
        self.target_ns > 0
    }

    pub fn overhead_ns(&self) -> i64 {
        self.overhead_ns
    }

    /// How long to actually sleep given the measured frame interval, after
    /// overhead compensation. `None` when the frame already ran long enough
    /// (or the remaining budget is within the overhead estimate).
    pub fn sleep_budget(&self, frame_interval_ns: i64) -> Option<i64> {
        let sleep_time = self.target_ns - frame_interval_ns;
        if sleep_time > self.overhead_ns {
            Some(sleep_time - self.overhead_ns)
        } else {
            None
        }
    }

    /// Fold one sleep's oversleep back into the overhead estimate.
    /// An estimate that grew past the target frame time would suppress
    /// sleeping forever, so it resets to zero instead.
    pub fn note_wakeup(&mut self, requested_ns: i64, actual_ns: i64) {
        self.overhead_ns = (actual_ns - requested_ns).max(0);
        if self.overhead_ns > self.target_ns {
            self.overhead_ns = 0;
        }
    }

    /// Block the calling thread to hold the frame at the target duration.
    /// Called on the presenting thread right after the present returns.
    pub fn pace(&mut self) {
        if !self.enabled() {
            return;
        }
        let frame_start = now_ns() as i64;
        let interval = frame_start - self.frame_end_ns;
        if let Some(budget) = self.sleep_budget(interval) {
            std::thread::sleep(std::time::Duration::from_nanos(budget as u64));
            let actual = now_ns() as i64 - frame_start;
            self.note_wakeup(budget, actual);
        }
        self.frame_end_ns = now_ns() as i64;
    }
}
