//! Per-process overlay session: config, telemetry, capture logging,
//! pacing and the control socket, bundled so each interception frontend
//! (Vulkan layer, GL shim) carries the same behavior.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::config::OverlayParams;
use crate::control::{ControlCommand, ControlServer};
use crate::pacer::FramePacer;
use crate::session_log::{self, LogSample, SessionLogger};
use crate::sources::{self, ProcCpu, ProcIo, ProcMemory, SysfsGpu};
use crate::telemetry::{SystemInfo, TelemetrySampler, TelemetrySnapshot};

pub struct OverlaySession {
    /// Replaced wholesale on a reload command, never mutated in place.
    params: RwLock<OverlayParams>,
    /// False when the process name is blacklisted; every hook then passes
    /// straight through.
    pub enabled: bool,

    pub telemetry: TelemetrySampler,
    pub pacer: Mutex<FramePacer>,
    /// Built on the first capture so the header row sees the GPU identity
    /// reported at device creation.
    logger: Mutex<Option<SessionLogger>>,
    capturing: AtomicBool,
    hud_hidden: AtomicBool,
    control: Mutex<Option<ControlServer>>,
    system_info: Mutex<SystemInfo>,
}

impl OverlaySession {
    /// Load config, probe telemetry sources and bind the control socket.
    pub fn init() -> Self {
        glimpse_common::logging::init_logging();
        let params = OverlayParams::load_or_default();
        let enabled = !glimpse_common::process::is_blacklisted(&params.blacklist);
        if !enabled {
            info!(
                process = %glimpse_common::process::process_name(),
                "overlay disabled for this process"
            );
        }

        let mut telemetry = TelemetrySampler::new()
            .with_cpu(Arc::new(ProcCpu::new()))
            .with_memory(Arc::new(ProcMemory::new()))
            .with_io(Arc::new(ProcIo::new()));
        if let Some(gpu) = SysfsGpu::discover() {
            telemetry = telemetry.with_gpu(Arc::new(gpu));
        }

        let control = if params.control.is_empty() {
            None
        } else {
            match ControlServer::bind(&params.control) {
                Ok(server) => Some(server),
                Err(e) => {
                    warn!("could not bind control socket {}: {e}", params.control);
                    None
                }
            }
        };

        let pacer = FramePacer::new(params.target_frame_time_ns());

        Self {
            enabled,
            telemetry,
            pacer: Mutex::new(pacer),
            logger: Mutex::new(None),
            capturing: AtomicBool::new(false),
            hud_hidden: AtomicBool::new(false),
            control: Mutex::new(control),
            system_info: Mutex::new(sources::system_info()),
            params: RwLock::new(params),
        }
    }

    /// The active parameter set. The guard is cheap; hot paths take it
    /// once per frame.
    pub fn params(&self) -> RwLockReadGuard<'_, OverlayParams> {
        self.params.read()
    }

    /// Re-read the configuration file and swap in the fresh parameter set.
    /// The control socket binding and the blacklist decision stay as they
    /// were at startup.
    pub fn reload_config(&self) {
        let fresh = OverlayParams::load_or_default();
        self.pacer.lock().set_target(fresh.target_frame_time_ns());
        *self.params.write() = fresh;
        info!("configuration reloaded");
    }

    /// Record the GPU identity the first created device reports.
    pub fn note_gpu(&self, gpu: String, driver: String) {
        let mut info = self.system_info.lock();
        if info.gpu.is_empty() {
            info.gpu = gpu;
            info.driver = driver;
        }
    }

    pub fn system_info(&self) -> SystemInfo {
        self.system_info.lock().clone()
    }

    /// Kick the background samplers; called from the present path once per
    /// sampling period.
    pub fn refresh_telemetry(&self) {
        self.telemetry.refresh_in_background();
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    /// HUD visibility after runtime toggles; `no_display` still wins.
    pub fn hud_visible(&self) -> bool {
        !self.params().no_display && !self.hud_hidden.load(Ordering::Relaxed)
    }

    pub fn toggle_hud(&self) {
        let hidden = self.hud_hidden.fetch_xor(true, Ordering::Relaxed);
        info!(visible = hidden, "hud toggled");
    }

    pub fn set_capturing(&self, on: bool) {
        let was = self.capturing.swap(on, Ordering::Relaxed);
        if was == on {
            return;
        }
        let mut guard = self.logger.lock();
        if on {
            info!("capture started");
            let params = self.params();
            let base = if params.output_file.is_empty() {
                session_log::default_output_base()
            } else {
                params.output_file.clone()
            };
            let logger = guard.get_or_insert_with(|| SessionLogger::new(base, self.system_info()));
            logger.start(glimpse_common::time::now_us(), params.log_duration_s);
        } else {
            info!("capture stopped");
            if let Some(logger) = guard.as_mut() {
                logger.stop();
            }
        }
    }

    /// Feed one frame into the session log if a capture is running.
    pub fn log_frame(&self, sample: LogSample) {
        if !self.capturing() {
            return;
        }
        let mut guard = self.logger.lock();
        if let Some(logger) = guard.as_mut() {
            logger.push(glimpse_common::time::now_us(), sample);
            if !logger.is_active() {
                // Hit the configured duration limit.
                self.capturing.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Drain the control socket and apply any completed commands. Called
    /// once per present from the presenting thread.
    pub fn poll_control(&self) {
        let commands = {
            let mut guard = self.control.lock();
            match guard.as_mut() {
                Some(server) => server.poll(),
                None => return,
            }
        };
        for cmd in commands {
            match cmd {
                ControlCommand::Capture { enabled } => self.set_capturing(enabled),
                ControlCommand::ToggleHud => self.toggle_hud(),
                ControlCommand::ReloadConfig => self.reload_config(),
            }
        }
    }

    /// Greeting sent to each control client; needs device identity, so it
    /// is installed once the frontend learns it.
    pub fn set_control_greeting(&self, device_name: String) {
        let mut guard = self.control.lock();
        if let Some(server) = guard.as_mut() {
            server.set_greeting(vec![
                ("GlimpseControlVersion".to_owned(), "1".to_owned()),
                ("DeviceName".to_owned(), device_name),
            ]);
        }
    }

    /// Sleep off the remainder of the frame budget when a limit is set.
    pub fn pace_frame(&self) {
        let mut pacer = self.pacer.lock();
        if pacer.enabled() {
            pacer.pace();
        }
    }
}
