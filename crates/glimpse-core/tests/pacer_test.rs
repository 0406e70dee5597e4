//! Integration test: frame pacer
//!
//! Verifies the sleep budget arithmetic and the self-correcting overhead
//! estimate, without actually sleeping.
//!
//! Run with: cargo test --test pacer_test -- --nocapture

use glimpse_core::pacer::FramePacer;

// 60 fps cap.
const TARGET_NS: i64 = 16_666_667;

#[test]
fn test_disabled_when_uncapped() {
    let pacer = FramePacer::new(0);
    if pacer.enabled() {
        panic!("expected pacing disabled at target 0");
    }
    let pacer = FramePacer::new(-1);
    if pacer.enabled() {
        panic!("expected pacing disabled at a negative target");
    }
}

#[test]
fn test_budget_is_remaining_frame_time() {
    let pacer = FramePacer::new(TARGET_NS);
    // Frame work took 10 ms of a 16.67 ms budget.
    match pacer.sleep_budget(10_000_000) {
        Some(budget) => {
            if budget != TARGET_NS - 10_000_000 {
                panic!("expected {} ns, got {}", TARGET_NS - 10_000_000, budget);
            }
        }
        None => panic!("expected a sleep budget for a fast frame"),
    }
}

#[test]
fn test_no_budget_for_slow_frames() {
    let pacer = FramePacer::new(TARGET_NS);
    if let Some(budget) = pacer.sleep_budget(TARGET_NS + 1) {
        panic!("expected no budget for a frame over target, got {}", budget);
    }
    if let Some(budget) = pacer.sleep_budget(TARGET_NS) {
        panic!("expected no budget for a frame exactly on target, got {}", budget);
    }
}

#[test]
fn test_overhead_shortens_the_next_sleep() {
    let mut pacer = FramePacer::new(TARGET_NS);
    // Asked for 6 ms, the OS woke us after 6.5 ms.
    pacer.note_wakeup(6_000_000, 6_500_000);
    if pacer.overhead_ns() != 500_000 {
        panic!("expected 500000 ns overhead, got {}", pacer.overhead_ns());
    }

    match pacer.sleep_budget(10_000_000) {
        Some(budget) => {
            let expected = TARGET_NS - 10_000_000 - 500_000;
            if budget != expected {
                panic!("expected {} ns, got {}", expected, budget);
            }
        }
        None => panic!("expected a compensated budget"),
    }
}

#[test]
fn test_budget_swallowed_by_overhead() {
    let mut pacer = FramePacer::new(TARGET_NS);
    pacer.note_wakeup(0, 2_000_000);
    // Only 1 ms of budget remains; sleeping would oversleep the frame.
    if let Some(budget) = pacer.sleep_budget(TARGET_NS - 1_000_000) {
        panic!("expected no sleep inside the overhead window, got {}", budget);
    }
}

#[test]
fn test_early_wakeup_clamps_to_zero() {
    let mut pacer = FramePacer::new(TARGET_NS);
    pacer.note_wakeup(6_000_000, 5_000_000);
    if pacer.overhead_ns() != 0 {
        panic!("expected overhead clamped to 0, got {}", pacer.overhead_ns());
    }
}

#[test]
fn test_runaway_overhead_resets() {
    let mut pacer = FramePacer::new(TARGET_NS);
    // A single pathological wakeup must not suppress sleeping forever.
    pacer.note_wakeup(1_000_000, 1_000_000 + TARGET_NS + 1);
    if pacer.overhead_ns() != 0 {
        panic!("expected runaway overhead reset to 0, got {}", pacer.overhead_ns());
    }
}

#[test]
fn test_set_target_reenables() {
    let mut pacer = FramePacer::new(0);
    pacer.set_target(TARGET_NS);
    if !pacer.enabled() {
        panic!("expected pacing enabled after set_target");
    }
}
