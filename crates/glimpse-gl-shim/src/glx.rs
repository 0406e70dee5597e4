//! The real libGL, loaded lazily, plus a cache of symbols resolved through
//! the driver's `glXGetProcAddress`.

use std::ffi::{c_char, c_int, c_uchar, c_ulong, c_void, CStr};
use std::sync::OnceLock;

use dashmap::DashMap;
use libloading::Library;
use tracing::warn;

pub type GlxDrawable = c_ulong;

pub type PfnSwapBuffers = unsafe extern "C" fn(dpy: *mut c_void, drawable: GlxDrawable);
pub type PfnSwapIntervalExt =
    unsafe extern "C" fn(dpy: *mut c_void, drawable: GlxDrawable, interval: c_int);
pub type PfnSwapIntervalSgi = unsafe extern "C" fn(interval: c_int) -> c_int;
pub type PfnSwapIntervalMesa = unsafe extern "C" fn(interval: c_int) -> c_int;
pub type PfnGetProcAddress =
    unsafe extern "C" fn(name: *const c_uchar) -> Option<unsafe extern "C" fn()>;
pub type PfnGetIntegerv = unsafe extern "C" fn(pname: u32, params: *mut c_int);

pub const GL_VIEWPORT: u32 = 0x0BA2;
pub const GL_SCISSOR_BOX: u32 = 0x0C10;

const LIB_CANDIDATES: [&str; 2] = ["libGL.so.1", "libGL.so"];

/// Entry points of the real driver library.
pub struct LibGl {
    _lib: Library,
    pub swap_buffers: PfnSwapBuffers,
    pub swap_interval_ext: Option<PfnSwapIntervalExt>,
    pub swap_interval_sgi: Option<PfnSwapIntervalSgi>,
    pub swap_interval_mesa: Option<PfnSwapIntervalMesa>,
    pub get_proc_address: Option<PfnGetProcAddress>,
    pub get_integerv: Option<PfnGetIntegerv>,
    /// Driver symbols already resolved through `glXGetProcAddress`.
    resolved: DashMap<String, usize>,
}

static LIBGL: OnceLock<Option<LibGl>> = OnceLock::new();

impl LibGl {
    /// The loaded driver library, or `None` when no GL driver is present.
    pub fn get() -> Option<&'static LibGl> {
        LIBGL.get_or_init(Self::open).as_ref()
    }

    fn open() -> Option<LibGl> {
        let lib = LIB_CANDIDATES.iter().find_map(|name| {
            // SAFETY: loading the system GL driver.
            unsafe { Library::new(name) }.ok()
        })?;

        // SAFETY: standard GLX/GL exports with the matching signatures.
        unsafe {
            let swap_buffers = match lib.get::<PfnSwapBuffers>(b"glXSwapBuffers\0") {
                Ok(sym) => *sym,
                Err(e) => {
                    warn!("libGL without glXSwapBuffers: {e}");
                    return None;
                }
            };
            let optional = |name: &[u8]| lib.get::<unsafe extern "C" fn()>(name).ok().map(|s| *s);
            let swap_interval_ext =
                optional(b"glXSwapIntervalEXT\0").map(|f| std::mem::transmute::<_, PfnSwapIntervalExt>(f));
            let swap_interval_sgi =
                optional(b"glXSwapIntervalSGI\0").map(|f| std::mem::transmute::<_, PfnSwapIntervalSgi>(f));
            let swap_interval_mesa =
                optional(b"glXSwapIntervalMESA\0").map(|f| std::mem::transmute::<_, PfnSwapIntervalMesa>(f));
            let get_proc_address =
                optional(b"glXGetProcAddressARB\0").or_else(|| optional(b"glXGetProcAddress\0"))
                    .map(|f| std::mem::transmute::<_, PfnGetProcAddress>(f));
            let get_integerv =
                optional(b"glGetIntegerv\0").map(|f| std::mem::transmute::<_, PfnGetIntegerv>(f));

            Some(LibGl {
                _lib: lib,
                swap_buffers,
                swap_interval_ext,
                swap_interval_sgi,
                swap_interval_mesa,
                get_proc_address,
                get_integerv,
                resolved: DashMap::new(),
            })
        }
    }

    /// Resolve a driver symbol through the real `glXGetProcAddress`,
    /// caching the answer.
    pub fn driver_proc(&self, name: &CStr) -> Option<unsafe extern "C" fn()> {
        let key = name.to_string_lossy().into_owned();
        if let Some(addr) = self.resolved.get(&key) {
            let addr = *addr;
            if addr == 0 {
                return None;
            }
            // SAFETY: cached from the driver's own resolver below.
            return Some(unsafe { std::mem::transmute::<usize, unsafe extern "C" fn()>(addr) });
        }
        let gpa = self.get_proc_address?;
        // SAFETY: driver resolver with a NUL-terminated name.
        let f = unsafe { gpa(name.as_ptr() as *const c_uchar) };
        self.resolved
            .insert(key, f.map(|f| f as usize).unwrap_or(0));
        f
    }

    /// Current viewport and scissor box, for output-size inference.
    pub fn viewport_and_scissor(&self) -> Option<([i32; 4], [i32; 4])> {
        let get = self.get_integerv?;
        let mut vp = [0 as c_int; 4];
        let mut sc = [0 as c_int; 4];
        // SAFETY: 4-element buffers as GL_VIEWPORT/GL_SCISSOR_BOX require.
        unsafe {
            get(GL_VIEWPORT, vp.as_mut_ptr());
            get(GL_SCISSOR_BOX, sc.as_mut_ptr());
        }
        Some((vp, sc))
    }
}

/// C string helper for exported resolvers.
///
/// # Safety
/// `name` must be NUL-terminated or null.
pub unsafe fn name_str<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(name) }.to_str().ok()
}
