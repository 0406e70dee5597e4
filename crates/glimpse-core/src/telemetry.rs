//! Telemetry collaborator seams.
//!
//! The core never touches sysfs, NVML or procfs itself. Vendor backends
//! implement the source traits; the sampler owns the latest snapshot behind
//! the coarse lock shared with the layout step and refreshes it on detached
//! background threads, so a present never blocks on a telemetry read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::CoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuSample {
    pub load_percent: u32,
    pub temp_c: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuSample {
    pub load_percent: u32,
    pub temp_c: i32,
    pub core_clock_mhz: u32,
    pub mem_clock_mhz: u32,
    pub vram_used_gib: f32,
    pub vram_total_gib: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySample {
    pub used_gib: f32,
    pub total_gib: f32,
}

/// Byte deltas since the previous refresh, already divided down to MiB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IoSample {
    pub read_mib: f32,
    pub write_mib: f32,
}

pub trait CpuStatSource: Send + Sync + 'static {
    fn sample(&self) -> Result<CpuSample, CoreError>;
}

pub trait GpuStatSource: Send + Sync + 'static {
    fn sample(&self) -> Result<GpuSample, CoreError>;
}

pub trait MemoryStatSource: Send + Sync + 'static {
    fn sample(&self) -> Result<MemorySample, CoreError>;
}

pub trait IoStatSource: Send + Sync + 'static {
    fn sample(&self) -> Result<IoSample, CoreError>;
}

/// Static environment description used for the session-log header row.
/// Filled in by the embedder once at device creation.
#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
    pub os: String,
    pub cpu: String,
    pub gpu: String,
    pub ram: String,
    pub kernel: String,
    pub driver: String,
}

/// Latest values from every telemetry category. Reading this is the only
/// way the render path sees telemetry; it never triggers I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub cpu: CpuSample,
    pub gpu: GpuSample,
    pub memory: MemorySample,
    pub io: IoSample,
}

struct Sources {
    cpu: Option<Arc<dyn CpuStatSource>>,
    gpu: Option<Arc<dyn GpuStatSource>>,
    memory: Option<Arc<dyn MemoryStatSource>>,
    io: Option<Arc<dyn IoStatSource>>,
}

/// Owns the snapshot and the refresh schedule. One per instance context.
pub struct TelemetrySampler {
    latest: Arc<Mutex<TelemetrySnapshot>>,
    sources: Sources,
    cpu_dead: Arc<AtomicBool>,
    gpu_dead: Arc<AtomicBool>,
    memory_dead: Arc<AtomicBool>,
    io_dead: Arc<AtomicBool>,
}

impl TelemetrySampler {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(Mutex::new(TelemetrySnapshot::default())),
            sources: Sources { cpu: None, gpu: None, memory: None, io: None },
            cpu_dead: Arc::new(AtomicBool::new(false)),
            gpu_dead: Arc::new(AtomicBool::new(false)),
            memory_dead: Arc::new(AtomicBool::new(false)),
            io_dead: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cpu(mut self, src: Arc<dyn CpuStatSource>) -> Self {
        self.sources.cpu = Some(src);
        self
    }

    pub fn with_gpu(mut self, src: Arc<dyn GpuStatSource>) -> Self {
        self.sources.gpu = Some(src);
        self
    }

    pub fn with_memory(mut self, src: Arc<dyn MemoryStatSource>) -> Self {
        self.sources.memory = Some(src);
        self
    }

    pub fn with_io(mut self, src: Arc<dyn IoStatSource>) -> Self {
        self.sources.io = Some(src);
        self
    }

    /// Non-blocking read of the latest values.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.latest.lock()
    }

    /// Kick off one refresh of every live category on detached threads.
    /// Called once per sampling period from the presenting thread; returns
    /// immediately. A category that errors is disabled for the session.
    pub fn refresh_in_background(&self) {
        if let Some(src) = self.sources.cpu.clone() {
            spawn_refresh(
                "cpu",
                self.cpu_dead.clone(),
                self.latest.clone(),
                move || src.sample(),
                |snap, s| snap.cpu = s,
            );
        }
        if let Some(src) = self.sources.gpu.clone() {
            spawn_refresh(
                "gpu",
                self.gpu_dead.clone(),
                self.latest.clone(),
                move || src.sample(),
                |snap, s| snap.gpu = s,
            );
        }
        if let Some(src) = self.sources.memory.clone() {
            spawn_refresh(
                "memory",
                self.memory_dead.clone(),
                self.latest.clone(),
                move || src.sample(),
                |snap, s| snap.memory = s,
            );
        }
        if let Some(src) = self.sources.io.clone() {
            spawn_refresh(
                "io",
                self.io_dead.clone(),
                self.latest.clone(),
                move || src.sample(),
                |snap, s| snap.io = s,
            );
        }
    }
}

impl Default for TelemetrySampler {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_refresh<T, S, A>(
    category: &'static str,
    dead: Arc<AtomicBool>,
    latest: Arc<Mutex<TelemetrySnapshot>>,
    sample: S,
    apply: A,
) where
    T: Send + 'static,
    S: FnOnce() -> Result<T, CoreError> + Send + 'static,
    A: FnOnce(&mut TelemetrySnapshot, T) + Send + 'static,
{
    if dead.load(Ordering::Relaxed) {
        return;
    }
    std::thread::spawn(move || {
        // Sample outside the lock, then write only this category's field,
        // so a slow backend neither stalls the presenting thread nor
        // clobbers another category's concurrent update.
        match sample() {
            Ok(value) => apply(&mut latest.lock(), value),
            Err(e) => {
                if !dead.swap(true, Ordering::Relaxed) {
                    warn!("{category} telemetry disabled for this session: {e}");
                }
            }
        }
    });
}
