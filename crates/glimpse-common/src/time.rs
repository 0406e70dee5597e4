//! Monotonic clock anchored at first use, in the units the stats code wants.

use std::sync::OnceLock;
use std::time::Instant;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Microseconds since the process-wide anchor.
pub fn now_us() -> u64 {
    anchor().elapsed().as_micros() as u64
}

/// Nanoseconds since the process-wide anchor.
pub fn now_ns() -> u64 {
    anchor().elapsed().as_nanos() as u64
}
