//! Session logging: per-frame samples captured into a double buffer and
//! flushed to a CSV-like file off the presenting thread.
//!
//! The presenting thread only ever appends to the write buffer and, at a
//! rotation boundary, moves the filled buffer into the flush channel as an
//! ownership transfer, not a pointer swap. A dedicated writer thread owns
//! the file and hands drained buffers back for reuse, so steady-state
//! logging allocates nothing.
//!
//! If the writer cannot drain a buffer before the other one refills, the
//! filled samples are dropped whole (counted in `dropped_samples`) rather
//! than blocking the present or interleaving partial rows. That is the
//! documented bounded-loss condition; it only occurs when file I/O is
//! slower than `LOG_BUF_SIZE` frame intervals for a sustained period.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error};

use crate::telemetry::SystemInfo;

/// Samples per buffer; a forced rotation happens when the write buffer
/// reaches this count before the session stops.
pub const LOG_BUF_SIZE: usize = 100;

/// One logged frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogSample {
    pub fps: f32,
    pub frametime_us: u64,
    pub cpu_load: u32,
    pub gpu_load: u32,
    /// Time since the session started, microseconds.
    pub elapsed_us: u64,
}

enum FlushJob {
    /// Open a fresh session file and write the header + environment rows.
    Start { path: PathBuf, info: SystemInfo },
    /// Write these rows, then hand the drained buffer back.
    Rows(Vec<LogSample>),
    /// Flush and close the current file, then acknowledge.
    Finish,
    Shutdown,
}

pub struct SessionLogger {
    jobs: Sender<FlushJob>,
    recycle: Receiver<Vec<LogSample>>,
    finish_ack: Receiver<()>,
    worker: Option<JoinHandle<()>>,

    base_path: String,
    info: SystemInfo,

    write_buf: Vec<LogSample>,
    spare: Option<Vec<LogSample>>,

    active: bool,
    session_start_us: u64,
    max_duration_us: u64,
    dropped_samples: u64,
}

impl SessionLogger {
    /// `base_path` is the configured output file name; each session appends
    /// a generation timestamp to it. `info` becomes the environment
    /// snapshot row of every session file.
    pub fn new(base_path: String, info: SystemInfo) -> Self {
        let (jobs_tx, jobs_rx) = unbounded::<FlushJob>();
        let (recycle_tx, recycle_rx) = unbounded::<Vec<LogSample>>();
        let (ack_tx, ack_rx) = bounded::<()>(1);

        let worker = std::thread::spawn(move || writer_loop(jobs_rx, recycle_tx, ack_tx));

        Self {
            jobs: jobs_tx,
            recycle: recycle_rx,
            finish_ack: ack_rx,
            worker: Some(worker),
            base_path,
            info,
            write_buf: Vec::with_capacity(LOG_BUF_SIZE),
            spare: Some(Vec::with_capacity(LOG_BUF_SIZE)),
            active: false,
            session_start_us: 0,
            max_duration_us: 0,
            dropped_samples: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Microseconds since the session started, 0 when inactive.
    pub fn elapsed_us(&self, now_us: u64) -> u64 {
        if self.active {
            now_us.saturating_sub(self.session_start_us)
        } else {
            0
        }
    }

    /// Samples lost to the bounded-loss condition since creation.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Begin a session: a new timestamped file gets the header line and one
    /// environment snapshot line before any samples. No-op while active.
    pub fn start(&mut self, now_us: u64, max_duration_s: u64) {
        if self.active || self.base_path.is_empty() {
            return;
        }
        let path = PathBuf::from(format!("{}{}", self.base_path, timestamp_suffix()));
        debug!("session log started: {}", path.display());
        let _ = self.jobs.send(FlushJob::Start { path, info: self.info.clone() });
        self.active = true;
        self.session_start_us = now_us;
        self.max_duration_us = max_duration_s * 1_000_000;
    }

    /// Append one sample. Rotates the buffers when full; stops the session
    /// itself once the configured maximum duration has elapsed.
    pub fn push(&mut self, now_us: u64, mut sample: LogSample) {
        if !self.active {
            return;
        }
        if self.max_duration_us > 0 && self.elapsed_us(now_us) >= self.max_duration_us {
            self.stop();
            return;
        }
        sample.elapsed_us = self.elapsed_us(now_us);
        self.write_buf.push(sample);
        if self.write_buf.len() >= LOG_BUF_SIZE {
            self.rotate();
        }
    }

    /// End the session: flush whatever accumulated and close the file.
    /// Blocks until the file is on disk (sessions end on a keypress or
    /// timeout, not in the per-frame fast path).
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if !self.write_buf.is_empty() {
            // Off the fast path: always hand the tail over, even if both
            // recycled buffers are still in flight.
            let full = std::mem::take(&mut self.write_buf);
            let _ = self.jobs.send(FlushJob::Rows(full));
        }
        let _ = self.jobs.send(FlushJob::Finish);
        let _ = self.finish_ack.recv();
    }

    /// Hand the filled buffer to the writer and install an empty one.
    fn rotate(&mut self) {
        // Prefer the spare, then anything the writer handed back.
        let replacement = self
            .spare
            .take()
            .or_else(|| self.recycle.try_recv().ok());

        match replacement {
            Some(empty) => {
                let full = std::mem::replace(&mut self.write_buf, empty);
                let _ = self.jobs.send(FlushJob::Rows(full));
            }
            None => {
                // Writer still owns both spares: bounded loss, not a stall.
                self.dropped_samples += self.write_buf.len() as u64;
                self.write_buf.clear();
            }
        }
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        self.stop();
        let _ = self.jobs.send(FlushJob::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn writer_loop(
    jobs: Receiver<FlushJob>,
    recycle: Sender<Vec<LogSample>>,
    finish_ack: Sender<()>,
) {
    let mut file: Option<BufWriter<std::fs::File>> = None;

    while let Ok(job) = jobs.recv() {
        match job {
            FlushJob::Start { path, info } => {
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(f) => {
                        let mut w = BufWriter::new(f);
                        let _ = writeln!(w, "os,cpu,gpu,ram,kernel,driver");
                        let _ = writeln!(
                            w,
                            "{},{},{},{},{},{}",
                            info.os, info.cpu, info.gpu, info.ram, info.kernel, info.driver
                        );
                        file = Some(w);
                    }
                    Err(e) => {
                        error!("cannot open session log {}: {e}", path.display());
                        file = None;
                    }
                }
            }
            FlushJob::Rows(mut rows) => {
                if let Some(w) = file.as_mut() {
                    for s in &rows {
                        let _ = writeln!(
                            w,
                            "{},{},{},{},{}",
                            s.frametime_us, s.fps, s.cpu_load, s.gpu_load, s.elapsed_us
                        );
                    }
                }
                rows.clear();
                let _ = recycle.send(rows);
            }
            FlushJob::Finish => {
                if let Some(mut w) = file.take() {
                    let _ = w.flush();
                }
                let _ = finish_ack.send(());
            }
            FlushJob::Shutdown => break,
        }
    }
}

/// Fallback log location when no output file is configured.
pub fn default_output_base() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => format!("{home}/glimpse_log"),
        _ => "/tmp/glimpse_log".to_owned(),
    }
}

/// Generation timestamp appended to the configured file name,
/// `YYYY-MM-DD_HH-MM-SS` in UTC.
fn timestamp_suffix() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let days = (secs / 86_400) as i64;
    let (y, m, d) = civil_from_days(days);
    let rem = secs % 86_400;
    format!(
        "{y:04}-{m:02}-{d:02}_{:02}-{:02}-{:02}",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

// Gregorian date from days since 1970-01-01.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
