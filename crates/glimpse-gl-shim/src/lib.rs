//! GLX interposition shim.
//!
//! Preloaded ahead of libGL, this library exports the handful of GLX entry
//! points the overlay cares about and forwards everything else to the real
//! driver. GL clients get frame timing, session capture, pacing, swap
//! interval override, and the HUD drawn into the back buffer before each
//! swap.

pub mod glx;
pub mod render;
pub mod viewport;

use std::ffi::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::debug;

use glimpse_core::draw::{DrawData, FrameReadout, OverlayRenderer, PlotRenderer};
use glimpse_core::session::OverlaySession;
use glimpse_core::session_log::LogSample;
use glimpse_core::stats::FrameTimingTracker;

use crate::glx::{GlxDrawable, LibGl};
use crate::render::GlRenderer;
use crate::viewport::SizeInference;

struct HudState {
    renderer: Box<dyn OverlayRenderer>,
    draw_data: DrawData,
    backend: Option<GlRenderer>,
    /// Set once backend creation fails, so a broken context is tried
    /// only once instead of every frame.
    backend_failed: bool,
}

struct Shim {
    session: OverlaySession,
    tracker: Mutex<FrameTimingTracker>,
    size: Mutex<SizeInference>,
    /// Last inferred output size, for the debug log and the control
    /// greeting.
    output: Mutex<(u32, u32)>,
    hud: Mutex<HudState>,
    interval_forced: AtomicBool,
}

static SHIM: OnceLock<Shim> = OnceLock::new();

impl Shim {
    fn get() -> &'static Shim {
        SHIM.get_or_init(|| {
            let shim = Shim {
                session: OverlaySession::init(),
                tracker: Mutex::new(FrameTimingTracker::new()),
                size: Mutex::new(SizeInference::new()),
                output: Mutex::new((0, 0)),
                hud: Mutex::new(HudState {
                    renderer: Box::new(PlotRenderer),
                    draw_data: DrawData::default(),
                    backend: None,
                    backend_failed: false,
                }),
                interval_forced: AtomicBool::new(false),
            };
            shim.session.set_control_greeting("OpenGL".to_owned());
            shim
        })
    }

    /// Push the configured swap interval into the driver, once.
    fn force_interval(&self, gl: &LibGl, dpy: *mut c_void, drawable: GlxDrawable) {
        let interval = self.session.params().gl_vsync;
        if interval == -2 || self.interval_forced.swap(true, Ordering::Relaxed) {
            return;
        }
        debug!(interval, "forcing swap interval");
        // SAFETY: driver entry points on the current context's display.
        unsafe {
            if let Some(f) = gl.swap_interval_ext {
                f(dpy, drawable, interval);
            } else if let Some(f) = gl.swap_interval_mesa {
                f(interval);
            } else if let Some(f) = gl.swap_interval_sgi {
                f(interval);
            }
        }
    }

    fn frame_hook(&self, gl: &LibGl) {
        let tick = {
            let mut tracker = self.tracker.lock();
            tracker.tick(
                glimpse_common::time::now_us(),
                self.session.params().fps_sampling_period_us,
            )
        };
        if tick.sampling_period_elapsed {
            self.session.refresh_telemetry();
        }

        if let Some((vp, sc)) = gl.viewport_and_scissor() {
            let inferred = self.size.lock().infer(vp, sc);
            let mut output = self.output.lock();
            if *output != inferred {
                debug!(width = inferred.0, height = inferred.1, "output size changed");
                *output = inferred;
            }
        }

        if let Some(frame_time_us) = tick.frame_time_us {
            let telemetry = self.session.telemetry_snapshot();
            let fps = self.tracker.lock().fps();
            self.session.log_frame(LogSample {
                fps,
                frametime_us: frame_time_us,
                cpu_load: telemetry.cpu.load_percent,
                gpu_load: telemetry.gpu.load_percent,
                elapsed_us: 0,
            });
        }

        self.session.poll_control();

        if self.session.hud_visible() {
            self.draw_hud(gl, tick.frame_time_us);
        }
    }

    /// Draw the HUD into the current back buffer, ahead of the swap.
    fn draw_hud(&self, gl: &LibGl, frame_time_us: Option<u64>) {
        let size = *self.output.lock();
        let (fps, frame_count) = {
            let tracker = self.tracker.lock();
            (tracker.fps() as f64, tracker.frame_count())
        };
        // The very first swap carries no usable interval yet; draw from
        // the second frame on.
        if size.0 == 0 || size.1 == 0 || frame_count <= 1 {
            return;
        }

        let telemetry = self.session.telemetry_snapshot();
        let readout = FrameReadout {
            fps,
            frame_time_us: frame_time_us.unwrap_or(0),
            cpu_load: telemetry.cpu.load_percent as f32,
            gpu_load: telemetry.gpu.load_percent as f32,
        };

        let mut hud = self.hud.lock();
        let hud = &mut *hud;
        hud.draw_data.clear();
        hud.draw_data.display_size = [size.0 as f32, size.1 as f32];
        {
            let tracker = self.tracker.lock();
            hud.renderer
                .render(&self.session.params(), &readout, &tracker.ring, &mut hud.draw_data);
        }
        if hud.draw_data.is_empty() {
            return;
        }

        if hud.backend.is_none() && !hud.backend_failed {
            match GlRenderer::create(gl) {
                Some(backend) => hud.backend = Some(backend),
                None => hud.backend_failed = true,
            }
        }
        if let Some(backend) = &hud.backend {
            // SAFETY: the application's context is current inside the
            // swap hook.
            unsafe { backend.render(&hud.draw_data) };
        }
    }
}

/// # Safety
/// Called by the application as `glXSwapBuffers`; `dpy` and `drawable`
/// must be a live GLX display and drawable.
#[no_mangle]
pub unsafe extern "C" fn glXSwapBuffers(dpy: *mut c_void, drawable: GlxDrawable) {
    let Some(gl) = LibGl::get() else { return };
    let shim = Shim::get();
    if shim.session.enabled {
        shim.force_interval(gl, dpy, drawable);
        shim.frame_hook(gl);
    }
    // SAFETY: forwarding to the real driver with the caller's arguments.
    unsafe { (gl.swap_buffers)(dpy, drawable) };
    if shim.session.enabled {
        shim.session.pace_frame();
    }
}

/// # Safety
/// Standard `glXSwapIntervalEXT` contract.
#[no_mangle]
pub unsafe extern "C" fn glXSwapIntervalEXT(dpy: *mut c_void, drawable: GlxDrawable, interval: c_int) {
    let Some(gl) = LibGl::get() else { return };
    let Some(f) = gl.swap_interval_ext else { return };
    let interval = override_interval(interval);
    // SAFETY: forwarding to the real driver.
    unsafe { f(dpy, drawable, interval) };
}

/// # Safety
/// Standard `glXSwapIntervalSGI` contract.
#[no_mangle]
pub unsafe extern "C" fn glXSwapIntervalSGI(interval: c_int) -> c_int {
    let Some(f) = LibGl::get().and_then(|gl| gl.swap_interval_sgi) else {
        return -1;
    };
    let interval = override_interval(interval);
    // SAFETY: forwarding to the real driver.
    unsafe { f(interval) }
}

/// # Safety
/// Standard `glXSwapIntervalMESA` contract.
#[no_mangle]
pub unsafe extern "C" fn glXSwapIntervalMESA(interval: c_int) -> c_int {
    let Some(f) = LibGl::get().and_then(|gl| gl.swap_interval_mesa) else {
        return -1;
    };
    let interval = override_interval(interval);
    // SAFETY: forwarding to the real driver.
    unsafe { f(interval) }
}

/// The application's requested interval, or the configured one when an
/// override is set.
fn override_interval(requested: c_int) -> c_int {
    let shim = Shim::get();
    let configured = shim.session.params().gl_vsync;
    if shim.session.enabled && configured != -2 {
        configured
    } else {
        requested
    }
}

/// # Safety
/// `name` must be a NUL-terminated symbol name, as `glXGetProcAddress`
/// requires.
#[no_mangle]
pub unsafe extern "C" fn glXGetProcAddress(name: *const c_char) -> Option<unsafe extern "C" fn()> {
    // SAFETY: contract forwarded from the caller.
    unsafe { resolve(name) }
}

/// # Safety
/// Same contract as [`glXGetProcAddress`].
#[no_mangle]
pub unsafe extern "C" fn glXGetProcAddressARB(name: *const c_char) -> Option<unsafe extern "C" fn()> {
    // SAFETY: contract forwarded from the caller.
    unsafe { resolve(name) }
}

unsafe fn resolve(name: *const c_char) -> Option<unsafe extern "C" fn()> {
    // SAFETY: caller passes a NUL-terminated name.
    let name_str = unsafe { glx::name_str(name) }?;
    let hook: Option<*const ()> = match name_str {
        "glXSwapBuffers" => Some(glXSwapBuffers as *const ()),
        "glXSwapIntervalEXT" => Some(glXSwapIntervalEXT as *const ()),
        "glXSwapIntervalSGI" => Some(glXSwapIntervalSGI as *const ()),
        "glXSwapIntervalMESA" => Some(glXSwapIntervalMESA as *const ()),
        "glXGetProcAddress" => Some(glXGetProcAddress as *const ()),
        "glXGetProcAddressARB" => Some(glXGetProcAddressARB as *const ()),
        _ => None,
    };
    if let Some(f) = hook {
        // SAFETY: all hooks above are `unsafe extern "C"` functions.
        return Some(unsafe { std::mem::transmute::<*const (), unsafe extern "C" fn()>(f) });
    }
    let gl = LibGl::get()?;
    // SAFETY: NUL-terminated per the caller's contract.
    gl.driver_proc(unsafe { std::ffi::CStr::from_ptr(name) })
}
