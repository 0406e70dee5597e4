//! Linux telemetry backends: procfs for CPU, memory and process I/O,
//! sysfs (amdgpu counters plus hwmon) for the GPU. NVIDIA exposes load
//! through NVML only, so on NVIDIA the GPU category stays disabled.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::CoreError;
use crate::telemetry::{
    CpuSample, CpuStatSource, GpuSample, GpuStatSource, IoSample, IoStatSource, MemorySample,
    MemoryStatSource, SystemInfo,
};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn read_trimmed(path: &Path) -> Result<String, CoreError> {
    Ok(fs::read_to_string(path)?.trim().to_owned())
}

fn parse_u64(s: &str) -> u64 {
    s.trim().parse().unwrap_or(0)
}

// ── CPU ─────────────────────────────────────────────────────

#[derive(Default, Clone, Copy)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

fn read_cpu_times() -> Result<CpuTimes, CoreError> {
    let stat = fs::read_to_string("/proc/stat")?;
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or(CoreError::TelemetryUnavailable("no cpu line in /proc/stat"))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(parse_u64)
        .collect();
    if fields.len() < 5 {
        return Err(CoreError::TelemetryUnavailable("short cpu line"));
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total: u64 = fields.iter().sum();
    Ok(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Aggregate CPU load from `/proc/stat` jiffy deltas, plus the package
/// temperature from whichever hwmon node names itself a CPU sensor.
pub struct ProcCpu {
    last: Mutex<CpuTimes>,
    temp_path: Option<PathBuf>,
}

impl ProcCpu {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(CpuTimes::default()),
            temp_path: find_hwmon_temp(&["coretemp", "k10temp", "zenpower"]),
        }
    }
}

impl Default for ProcCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStatSource for ProcCpu {
    fn sample(&self) -> Result<CpuSample, CoreError> {
        let now = read_cpu_times()?;
        let mut last = self.last.lock();
        let d_busy = now.busy.saturating_sub(last.busy);
        let d_total = now.total.saturating_sub(last.total);
        *last = now;
        drop(last);

        let load_percent = if d_total == 0 {
            0
        } else {
            ((d_busy * 100) / d_total) as u32
        };
        let temp_c = match &self.temp_path {
            Some(p) => read_trimmed(p)
                .map(|s| (parse_u64(&s) / 1000) as i32)
                .unwrap_or(0),
            None => 0,
        };
        Ok(CpuSample {
            load_percent,
            temp_c,
        })
    }
}

fn find_hwmon_temp(names: &[&str]) -> Option<PathBuf> {
    let entries = fs::read_dir("/sys/class/hwmon").ok()?;
    for entry in entries.flatten() {
        let dir = entry.path();
        let name = fs::read_to_string(dir.join("name")).unwrap_or_default();
        if names.contains(&name.trim()) {
            let temp = dir.join("temp1_input");
            if temp.exists() {
                return Some(temp);
            }
        }
    }
    None
}

// ── Memory ──────────────────────────────────────────────────

pub struct ProcMemory;

impl ProcMemory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStatSource for ProcMemory {
    fn sample(&self) -> Result<MemorySample, CoreError> {
        let meminfo = fs::read_to_string("/proc/meminfo")?;
        let field = |key: &str| -> u64 {
            meminfo
                .lines()
                .find(|l| l.starts_with(key))
                .and_then(|l| l.split_whitespace().nth(1))
                .map(parse_u64)
                .unwrap_or(0)
        };
        let total_kib = field("MemTotal:");
        let avail_kib = field("MemAvailable:");
        Ok(MemorySample {
            used_gib: (total_kib.saturating_sub(avail_kib)) as f32 / (1024.0 * 1024.0),
            total_gib: total_kib as f32 / (1024.0 * 1024.0),
        })
    }
}

// ── Process I/O ─────────────────────────────────────────────

#[derive(Default, Clone, Copy)]
struct IoBytes {
    read: u64,
    write: u64,
}

/// Byte counters for this process from `/proc/self/io`, reported as the
/// delta since the previous refresh.
pub struct ProcIo {
    last: Mutex<IoBytes>,
}

impl ProcIo {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(IoBytes::default()),
        }
    }
}

impl Default for ProcIo {
    fn default() -> Self {
        Self::new()
    }
}

impl IoStatSource for ProcIo {
    fn sample(&self) -> Result<IoSample, CoreError> {
        let io = fs::read_to_string("/proc/self/io")?;
        let field = |key: &str| -> u64 {
            io.lines()
                .find(|l| l.starts_with(key))
                .and_then(|l| l.split(':').nth(1))
                .map(parse_u64)
                .unwrap_or(0)
        };
        let now = IoBytes {
            read: field("read_bytes"),
            write: field("write_bytes"),
        };
        let mut last = self.last.lock();
        let sample = IoSample {
            read_mib: now.read.saturating_sub(last.read) as f32 / (1024.0 * 1024.0),
            write_mib: now.write.saturating_sub(last.write) as f32 / (1024.0 * 1024.0),
        };
        *last = now;
        Ok(sample)
    }
}

// ── GPU (amdgpu sysfs) ──────────────────────────────────────

/// amdgpu exposes everything the HUD shows as flat sysfs files under the
/// drm card's device directory.
pub struct SysfsGpu {
    device: PathBuf,
    hwmon: Option<PathBuf>,
}

impl SysfsGpu {
    /// Probe drm cards for one with a `gpu_busy_percent` node.
    pub fn discover() -> Option<Self> {
        let entries = fs::read_dir("/sys/class/drm").ok()?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("card") || name.contains('-') {
                continue;
            }
            let device = entry.path().join("device");
            if device.join("gpu_busy_percent").exists() {
                let hwmon = fs::read_dir(device.join("hwmon"))
                    .ok()
                    .and_then(|mut d| d.next())
                    .and_then(|e| e.ok())
                    .map(|e| e.path());
                return Some(Self { device, hwmon });
            }
        }
        None
    }

    fn read_u64(&self, file: &str) -> Result<u64, CoreError> {
        Ok(parse_u64(&read_trimmed(&self.device.join(file))?))
    }
}

impl GpuStatSource for SysfsGpu {
    fn sample(&self) -> Result<GpuSample, CoreError> {
        let load_percent = self.read_u64("gpu_busy_percent")? as u32;
        let vram_used = self.read_u64("mem_info_vram_used").unwrap_or(0);
        let vram_total = self.read_u64("mem_info_vram_total").unwrap_or(0);

        let (mut temp_c, mut core_clock_mhz, mut mem_clock_mhz) = (0, 0, 0);
        if let Some(hwmon) = &self.hwmon {
            temp_c = read_trimmed(&hwmon.join("temp1_input"))
                .map(|s| (parse_u64(&s) / 1000) as i32)
                .unwrap_or(0);
            core_clock_mhz = read_trimmed(&hwmon.join("freq1_input"))
                .map(|s| (parse_u64(&s) / 1_000_000) as u32)
                .unwrap_or(0);
            mem_clock_mhz = read_trimmed(&hwmon.join("freq2_input"))
                .map(|s| (parse_u64(&s) / 1_000_000) as u32)
                .unwrap_or(0);
        }

        Ok(GpuSample {
            load_percent,
            temp_c,
            core_clock_mhz,
            mem_clock_mhz,
            vram_used_gib: (vram_used as f64 / GIB) as f32,
            vram_total_gib: (vram_total as f64 / GIB) as f32,
        })
    }
}

// ── Static environment ──────────────────────────────────────

/// Everything for the session-log header that does not need a GPU driver:
/// the gpu and driver fields stay empty until device creation fills them.
pub fn system_info() -> SystemInfo {
    let os = fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("PRETTY_NAME="))
                .map(|l| l.trim_start_matches("PRETTY_NAME=").trim_matches('"').to_owned())
        })
        .unwrap_or_default();

    let cpu = fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|v| v.trim().to_owned())
        })
        .unwrap_or_default();

    let ram = fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("MemTotal:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .map(|kib| format!("{:.1} GiB", parse_u64(kib) as f64 / (1024.0 * 1024.0)))
        })
        .unwrap_or_default();

    let kernel = fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_owned())
        .unwrap_or_default();

    SystemInfo {
        os,
        cpu,
        ram,
        kernel,
        gpu: String::new(),
        driver: String::new(),
    }
}
