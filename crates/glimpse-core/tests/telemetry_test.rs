//! Integration test: background telemetry refresh.
//!
//! Run with: cargo test --test telemetry_test -- --nocapture

use std::sync::Arc;
use std::time::{Duration, Instant};

use glimpse_core::telemetry::{
    CpuSample, CpuStatSource, GpuSample, GpuStatSource, TelemetrySampler,
};
use glimpse_core::CoreError;

struct SlowCpu;

impl CpuStatSource for SlowCpu {
    fn sample(&self) -> Result<CpuSample, CoreError> {
        std::thread::sleep(Duration::from_millis(200));
        Ok(CpuSample {
            load_percent: 25,
            temp_c: 40,
        })
    }
}

struct FastGpu;

impl GpuStatSource for FastGpu {
    fn sample(&self) -> Result<GpuSample, CoreError> {
        Ok(GpuSample {
            load_percent: 55,
            ..Default::default()
        })
    }
}

struct BrokenGpu;

impl GpuStatSource for BrokenGpu {
    fn sample(&self) -> Result<GpuSample, CoreError> {
        Err(CoreError::TelemetryUnavailable("gpu"))
    }
}

/// Poll the sampler until `pred` holds or the deadline passes.
fn wait_for(sampler: &TelemetrySampler, pred: impl Fn(&TelemetrySampler) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if pred(sampler) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_slow_category_does_not_clobber_fast_one() {
    let sampler = TelemetrySampler::new()
        .with_cpu(Arc::new(SlowCpu))
        .with_gpu(Arc::new(FastGpu));

    sampler.refresh_in_background();

    // The GPU sample lands long before the CPU one finishes sleeping.
    if !wait_for(&sampler, |s| s.snapshot().gpu.load_percent == 55) {
        panic!("gpu sample never landed: {:?}", sampler.snapshot());
    }
    if !wait_for(&sampler, |s| s.snapshot().cpu.load_percent == 25) {
        panic!("cpu sample never landed: {:?}", sampler.snapshot());
    }

    // The late CPU write must not have reverted the GPU field.
    let snap = sampler.snapshot();
    if snap.gpu.load_percent != 55 {
        panic!("expected gpu 55, got {} (update lost)", snap.gpu.load_percent);
    }
    if snap.cpu.load_percent != 25 {
        panic!("expected cpu 25, got {}", snap.cpu.load_percent);
    }
}

#[test]
fn test_failing_category_leaves_others_untouched() {
    let sampler = TelemetrySampler::new()
        .with_cpu(Arc::new(SlowCpu))
        .with_gpu(Arc::new(BrokenGpu));

    sampler.refresh_in_background();
    if !wait_for(&sampler, |s| s.snapshot().cpu.load_percent == 25) {
        panic!("cpu sample never landed: {:?}", sampler.snapshot());
    }

    let snap = sampler.snapshot();
    if snap.gpu != GpuSample::default() {
        panic!("broken gpu source wrote a sample: {:?}", snap.gpu);
    }
}
