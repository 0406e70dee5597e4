//! Overlay configuration, loaded from glimpse.toml.
//!
//! The parameter set is immutable for a session: it is parsed once when the
//! first instance comes up and replaced wholesale on an explicit reload
//! signal, never mutated in place.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Which overlay position corner the HUD anchors to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HudPosition {
    #[default]
    #[serde(rename = "top-left")]
    TopLeft,
    #[serde(rename = "top-right")]
    TopRight,
    #[serde(rename = "bottom-left")]
    BottomLeft,
    #[serde(rename = "bottom-right")]
    BottomRight,
}

/// Per-metric enable switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnabledMetrics {
    #[serde(default = "default_true")]
    pub fps: bool,
    #[serde(default = "default_true")]
    pub frame_timing: bool,
    #[serde(default = "default_true")]
    pub gpu_stats: bool,
    #[serde(default)]
    pub gpu_temp: bool,
    #[serde(default)]
    pub gpu_core_clock: bool,
    #[serde(default)]
    pub gpu_mem_clock: bool,
    #[serde(default = "default_true")]
    pub cpu_stats: bool,
    #[serde(default)]
    pub cpu_temp: bool,
    #[serde(default)]
    pub core_load: bool,
    #[serde(default)]
    pub ram: bool,
    #[serde(default)]
    pub vram: bool,
    #[serde(default)]
    pub io_read: bool,
    #[serde(default)]
    pub io_write: bool,
    #[serde(default)]
    pub engine_version: bool,
}

impl Default for EnabledMetrics {
    fn default() -> Self {
        Self {
            fps: true,
            frame_timing: true,
            gpu_stats: true,
            gpu_temp: false,
            gpu_core_clock: false,
            gpu_mem_clock: false,
            cpu_stats: true,
            cpu_temp: false,
            core_load: false,
            ram: false,
            vram: false,
            io_read: false,
            io_write: false,
            engine_version: false,
        }
    }
}

/// RGBA colors as 0xRRGGBBAA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HudColors {
    #[serde(default = "default_text_color")]
    pub text: u32,
    #[serde(default = "default_background_color")]
    pub background: u32,
    #[serde(default = "default_accent_color")]
    pub frametime_plot: u32,
}

impl Default for HudColors {
    fn default() -> Self {
        Self {
            text: default_text_color(),
            background: default_background_color(),
            frametime_plot: default_accent_color(),
        }
    }
}

/// The immutable per-session parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayParams {
    #[serde(default)]
    pub enabled: EnabledMetrics,
    #[serde(default)]
    pub colors: HudColors,
    #[serde(default)]
    pub position: HudPosition,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default = "default_hud_width")]
    pub width: u32,
    #[serde(default = "default_hud_height")]
    pub height: u32,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_alpha")]
    pub background_alpha: f32,
    /// Hide all HUD content while keeping the hooks live.
    #[serde(default)]
    pub no_display: bool,

    /// Vulkan present-mode override: 0 fifo_relaxed, 1 immediate, 2 mailbox,
    /// 3 fifo; any other value leaves the application's choice alone.
    #[serde(default = "default_vsync")]
    pub vsync: u32,
    /// GLX swap interval override; -2 leaves the application's choice
    /// (-1 requests adaptive sync where the driver supports it).
    #[serde(default = "default_gl_vsync")]
    pub gl_vsync: i32,

    /// Heavy telemetry refresh cadence, microseconds.
    #[serde(default = "default_sampling_period_us")]
    pub fps_sampling_period_us: u64,

    /// Frame-rate cap; 0 disables the pacer.
    #[serde(default)]
    pub fps_limit: u32,

    /// Session log output base name; defaults to `$HOME/glimpse_log`.
    #[serde(default)]
    pub output_file: String,
    /// Maximum logging-session duration in seconds; 0 means until toggled.
    #[serde(default)]
    pub log_duration_s: u64,

    /// X11 keysym names consumed by the embedder's key-poll collaborator.
    #[serde(default = "default_toggle_logging")]
    pub toggle_logging: String,
    #[serde(default = "default_toggle_hud")]
    pub toggle_hud: String,
    #[serde(default = "default_reload_config")]
    pub reload_config: String,

    /// Unix socket path for the control protocol; empty disables it.
    #[serde(default)]
    pub control: String,

    /// Extra process names to stay out of, on top of the built-in list.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl Default for OverlayParams {
    fn default() -> Self {
        // Round-trip through serde so field defaults live in one place.
        #[allow(clippy::unwrap_used)]
        toml::from_str("").unwrap()
    }
}

impl OverlayParams {
    /// Load parameters from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load from `GLIMPSE_CONFIG` or the default search path, falling back
    /// to defaults (with a log line) when nothing parses.
    pub fn load_or_default() -> Self {
        let path = std::env::var("GLIMPSE_CONFIG").unwrap_or_else(|_| default_config_path());
        match Self::load(&path) {
            Ok(params) => params,
            Err(CoreError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("config {path} not usable ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Target frame duration for the pacer, or 0 when uncapped.
    pub fn target_frame_time_ns(&self) -> i64 {
        if self.fps_limit == 0 {
            0
        } else {
            1_000_000_000 / self.fps_limit as i64
        }
    }
}

/// Search order: $XDG_CONFIG_HOME/glimpse/glimpse.toml, then ./glimpse.toml.
pub fn default_config_path() -> String {
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        let path = format!("{base}/glimpse/glimpse.toml");
        if std::path::Path::new(&path).exists() {
            return path;
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        let path = format!("{home}/.config/glimpse/glimpse.toml");
        if std::path::Path::new(&path).exists() {
            return path;
        }
    }
    "glimpse.toml".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hud_width() -> u32 {
    280
}

fn default_hud_height() -> u32 {
    140
}

fn default_font_size() -> u32 {
    24
}

fn default_alpha() -> f32 {
    0.5
}

fn default_vsync() -> u32 {
    // Out of range: keep the application's present mode.
    u32::MAX
}

fn default_gl_vsync() -> i32 {
    -2
}

fn default_sampling_period_us() -> u64 {
    500_000
}

fn default_text_color() -> u32 {
    0xffff_ffff
}

fn default_background_color() -> u32 {
    0x0202_0260
}

fn default_accent_color() -> u32 {
    0x00ff_00ff
}

fn default_toggle_logging() -> String {
    "F2".to_string()
}

fn default_toggle_hud() -> String {
    "F12".to_string()
}

fn default_reload_config() -> String {
    "F4".to_string()
}
