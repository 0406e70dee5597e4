//! GL3 backend for the overlay geometry.
//!
//! Draws the [`DrawData`] a renderer produced straight into the back
//! buffer right before the swap. Every entry point is resolved through
//! the driver's `glXGetProcAddress` on first use (a context is current
//! inside the swap hook), and the application's GL state is saved around
//! the draw and restored afterwards.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};

use tracing::warn;

use glimpse_core::draw::{DrawData, DrawVert};

use crate::glx::LibGl;

// ── GL constants ────────────────────────────────────────────

const GL_TRIANGLES: c_uint = 0x0004;
const GL_UNSIGNED_BYTE: c_uint = 0x1401;
const GL_UNSIGNED_SHORT: c_uint = 0x1403;
const GL_FLOAT: c_uint = 0x1406;
const GL_RGBA: c_uint = 0x1908;
const GL_TEXTURE_2D: c_uint = 0x0DE1;
const GL_TEXTURE_MIN_FILTER: c_uint = 0x2801;
const GL_TEXTURE_MAG_FILTER: c_uint = 0x2800;
const GL_LINEAR: c_int = 0x2601;
const GL_BLEND: c_uint = 0x0BE2;
const GL_SCISSOR_TEST: c_uint = 0x0C11;
const GL_DEPTH_TEST: c_uint = 0x0B71;
const GL_CULL_FACE: c_uint = 0x0B44;
const GL_SRC_ALPHA: c_uint = 0x0302;
const GL_ONE_MINUS_SRC_ALPHA: c_uint = 0x0303;
const GL_FUNC_ADD: c_uint = 0x8006;
const GL_ARRAY_BUFFER: c_uint = 0x8892;
const GL_ELEMENT_ARRAY_BUFFER: c_uint = 0x8893;
const GL_STREAM_DRAW: c_uint = 0x88E0;
const GL_VERTEX_SHADER: c_uint = 0x8B31;
const GL_FRAGMENT_SHADER: c_uint = 0x8B30;
const GL_COMPILE_STATUS: c_uint = 0x8B81;
const GL_LINK_STATUS: c_uint = 0x8B82;
const GL_TEXTURE0: c_uint = 0x84C0;
const GL_CURRENT_PROGRAM: c_uint = 0x8B8D;
const GL_TEXTURE_BINDING_2D: c_uint = 0x8069;
const GL_ACTIVE_TEXTURE: c_uint = 0x84E0;
const GL_ARRAY_BUFFER_BINDING: c_uint = 0x8894;
const GL_VERTEX_ARRAY_BINDING: c_uint = 0x85B5;

const VERT_SRC: &CStr = c"#version 130
uniform vec4 uTransform;
in vec2 aPos;
in vec2 aUv;
in vec4 aCol;
out vec2 vUv;
out vec4 vCol;
void main() {
    vUv = aUv;
    vCol = aCol;
    gl_Position = vec4(aPos * uTransform.xy + uTransform.zw, 0.0, 1.0);
}";

const FRAG_SRC: &CStr = c"#version 130
uniform sampler2D uTex;
in vec2 vUv;
in vec4 vCol;
out vec4 color;
void main() {
    color = vCol * texture(uTex, vUv);
}";

// ── Entry points ────────────────────────────────────────────

type PfnEnable = unsafe extern "C" fn(cap: c_uint);
type PfnDisable = unsafe extern "C" fn(cap: c_uint);
type PfnIsEnabled = unsafe extern "C" fn(cap: c_uint) -> c_uint;
type PfnGetIntegerv = unsafe extern "C" fn(pname: c_uint, params: *mut c_int);
type PfnViewport = unsafe extern "C" fn(x: c_int, y: c_int, w: c_int, h: c_int);
type PfnScissor = unsafe extern "C" fn(x: c_int, y: c_int, w: c_int, h: c_int);
type PfnBlendEquation = unsafe extern "C" fn(mode: c_uint);
type PfnBlendFunc = unsafe extern "C" fn(sfactor: c_uint, dfactor: c_uint);
type PfnActiveTexture = unsafe extern "C" fn(texture: c_uint);
type PfnGenTextures = unsafe extern "C" fn(n: c_int, textures: *mut c_uint);
type PfnBindTexture = unsafe extern "C" fn(target: c_uint, texture: c_uint);
type PfnTexImage2D = unsafe extern "C" fn(
    target: c_uint,
    level: c_int,
    internal: c_int,
    width: c_int,
    height: c_int,
    border: c_int,
    format: c_uint,
    ty: c_uint,
    pixels: *const c_void,
);
type PfnTexParameteri = unsafe extern "C" fn(target: c_uint, pname: c_uint, param: c_int);
type PfnCreateShader = unsafe extern "C" fn(ty: c_uint) -> c_uint;
type PfnShaderSource = unsafe extern "C" fn(
    shader: c_uint,
    count: c_int,
    sources: *const *const c_char,
    lengths: *const c_int,
);
type PfnCompileShader = unsafe extern "C" fn(shader: c_uint);
type PfnGetShaderiv = unsafe extern "C" fn(shader: c_uint, pname: c_uint, params: *mut c_int);
type PfnDeleteShader = unsafe extern "C" fn(shader: c_uint);
type PfnCreateProgram = unsafe extern "C" fn() -> c_uint;
type PfnAttachShader = unsafe extern "C" fn(program: c_uint, shader: c_uint);
type PfnLinkProgram = unsafe extern "C" fn(program: c_uint);
type PfnGetProgramiv = unsafe extern "C" fn(program: c_uint, pname: c_uint, params: *mut c_int);
type PfnUseProgram = unsafe extern "C" fn(program: c_uint);
type PfnGetUniformLocation =
    unsafe extern "C" fn(program: c_uint, name: *const c_char) -> c_int;
type PfnGetAttribLocation =
    unsafe extern "C" fn(program: c_uint, name: *const c_char) -> c_int;
type PfnUniform1i = unsafe extern "C" fn(location: c_int, v: c_int);
type PfnUniform4f =
    unsafe extern "C" fn(location: c_int, x: f32, y: f32, z: f32, w: f32);
type PfnGenVertexArrays = unsafe extern "C" fn(n: c_int, arrays: *mut c_uint);
type PfnBindVertexArray = unsafe extern "C" fn(array: c_uint);
type PfnGenBuffers = unsafe extern "C" fn(n: c_int, buffers: *mut c_uint);
type PfnBindBuffer = unsafe extern "C" fn(target: c_uint, buffer: c_uint);
type PfnBufferData = unsafe extern "C" fn(
    target: c_uint,
    size: isize,
    data: *const c_void,
    usage: c_uint,
);
type PfnEnableVertexAttribArray = unsafe extern "C" fn(index: c_uint);
type PfnVertexAttribPointer = unsafe extern "C" fn(
    index: c_uint,
    size: c_int,
    ty: c_uint,
    normalized: c_uint,
    stride: c_int,
    offset: *const c_void,
);
type PfnDrawElements = unsafe extern "C" fn(
    mode: c_uint,
    count: c_int,
    ty: c_uint,
    indices: *const c_void,
);

struct GlFns {
    enable: PfnEnable,
    disable: PfnDisable,
    is_enabled: PfnIsEnabled,
    get_integerv: PfnGetIntegerv,
    viewport: PfnViewport,
    scissor: PfnScissor,
    blend_equation: PfnBlendEquation,
    blend_func: PfnBlendFunc,
    active_texture: PfnActiveTexture,
    gen_textures: PfnGenTextures,
    bind_texture: PfnBindTexture,
    tex_image_2d: PfnTexImage2D,
    tex_parameteri: PfnTexParameteri,
    create_shader: PfnCreateShader,
    shader_source: PfnShaderSource,
    compile_shader: PfnCompileShader,
    get_shaderiv: PfnGetShaderiv,
    delete_shader: PfnDeleteShader,
    create_program: PfnCreateProgram,
    attach_shader: PfnAttachShader,
    link_program: PfnLinkProgram,
    get_programiv: PfnGetProgramiv,
    use_program: PfnUseProgram,
    get_uniform_location: PfnGetUniformLocation,
    get_attrib_location: PfnGetAttribLocation,
    uniform_1i: PfnUniform1i,
    uniform_4f: PfnUniform4f,
    gen_vertex_arrays: PfnGenVertexArrays,
    bind_vertex_array: PfnBindVertexArray,
    gen_buffers: PfnGenBuffers,
    bind_buffer: PfnBindBuffer,
    buffer_data: PfnBufferData,
    enable_vertex_attrib_array: PfnEnableVertexAttribArray,
    vertex_attrib_pointer: PfnVertexAttribPointer,
    draw_elements: PfnDrawElements,
}

/// Resolve one symbol through the driver, transmuted to its typed form.
macro_rules! resolve {
    ($gl:expr, $ty:ty, $name:literal) => {{
        let f = $gl.driver_proc($name)?;
        // SAFETY: the driver hands back the entry point matching the name.
        unsafe { std::mem::transmute_copy::<unsafe extern "C" fn(), $ty>(&f) }
    }};
}

impl GlFns {
    fn load(gl: &LibGl) -> Option<GlFns> {
        Some(GlFns {
            enable: resolve!(gl, PfnEnable, c"glEnable"),
            disable: resolve!(gl, PfnDisable, c"glDisable"),
            is_enabled: resolve!(gl, PfnIsEnabled, c"glIsEnabled"),
            get_integerv: resolve!(gl, PfnGetIntegerv, c"glGetIntegerv"),
            viewport: resolve!(gl, PfnViewport, c"glViewport"),
            scissor: resolve!(gl, PfnScissor, c"glScissor"),
            blend_equation: resolve!(gl, PfnBlendEquation, c"glBlendEquation"),
            blend_func: resolve!(gl, PfnBlendFunc, c"glBlendFunc"),
            active_texture: resolve!(gl, PfnActiveTexture, c"glActiveTexture"),
            gen_textures: resolve!(gl, PfnGenTextures, c"glGenTextures"),
            bind_texture: resolve!(gl, PfnBindTexture, c"glBindTexture"),
            tex_image_2d: resolve!(gl, PfnTexImage2D, c"glTexImage2D"),
            tex_parameteri: resolve!(gl, PfnTexParameteri, c"glTexParameteri"),
            create_shader: resolve!(gl, PfnCreateShader, c"glCreateShader"),
            shader_source: resolve!(gl, PfnShaderSource, c"glShaderSource"),
            compile_shader: resolve!(gl, PfnCompileShader, c"glCompileShader"),
            get_shaderiv: resolve!(gl, PfnGetShaderiv, c"glGetShaderiv"),
            delete_shader: resolve!(gl, PfnDeleteShader, c"glDeleteShader"),
            create_program: resolve!(gl, PfnCreateProgram, c"glCreateProgram"),
            attach_shader: resolve!(gl, PfnAttachShader, c"glAttachShader"),
            link_program: resolve!(gl, PfnLinkProgram, c"glLinkProgram"),
            get_programiv: resolve!(gl, PfnGetProgramiv, c"glGetProgramiv"),
            use_program: resolve!(gl, PfnUseProgram, c"glUseProgram"),
            get_uniform_location: resolve!(gl, PfnGetUniformLocation, c"glGetUniformLocation"),
            get_attrib_location: resolve!(gl, PfnGetAttribLocation, c"glGetAttribLocation"),
            uniform_1i: resolve!(gl, PfnUniform1i, c"glUniform1i"),
            uniform_4f: resolve!(gl, PfnUniform4f, c"glUniform4f"),
            gen_vertex_arrays: resolve!(gl, PfnGenVertexArrays, c"glGenVertexArrays"),
            bind_vertex_array: resolve!(gl, PfnBindVertexArray, c"glBindVertexArray"),
            gen_buffers: resolve!(gl, PfnGenBuffers, c"glGenBuffers"),
            bind_buffer: resolve!(gl, PfnBindBuffer, c"glBindBuffer"),
            buffer_data: resolve!(gl, PfnBufferData, c"glBufferData"),
            enable_vertex_attrib_array: resolve!(
                gl,
                PfnEnableVertexAttribArray,
                c"glEnableVertexAttribArray"
            ),
            vertex_attrib_pointer: resolve!(gl, PfnVertexAttribPointer, c"glVertexAttribPointer"),
            draw_elements: resolve!(gl, PfnDrawElements, c"glDrawElements"),
        })
    }
}

/// GL objects the overlay draws with, created once per process against the
/// application's context.
pub struct GlRenderer {
    fns: GlFns,
    program: c_uint,
    u_transform: c_int,
    vao: c_uint,
    vbo: c_uint,
    ebo: c_uint,
    white_tex: c_uint,
}

/// The GL state a draw touches; captured before, reapplied after.
struct SavedState {
    program: c_int,
    texture: c_int,
    active_texture: c_int,
    array_buffer: c_int,
    vertex_array: c_int,
    viewport: [c_int; 4],
    scissor_box: [c_int; 4],
    blend: bool,
    scissor_test: bool,
    depth_test: bool,
    cull_face: bool,
}

impl GlRenderer {
    /// Compile the program and build the buffers. `None` (with a log line)
    /// when the context is too old for GLSL 130 or a symbol is missing.
    pub fn create(gl: &LibGl) -> Option<GlRenderer> {
        let fns = match GlFns::load(gl) {
            Some(fns) => fns,
            None => {
                warn!("driver lacks the GL3 entry points, overlay drawing disabled");
                return None;
            }
        };

        // SAFETY: a context is current (we are inside the swap hook).
        unsafe {
            // One-time object creation rebinds; put the application's
            // bindings back before returning.
            let mut prev_tex = 0;
            (fns.get_integerv)(GL_TEXTURE_BINDING_2D, &mut prev_tex);
            let mut prev_buf = 0;
            (fns.get_integerv)(GL_ARRAY_BUFFER_BINDING, &mut prev_buf);
            let mut prev_vao = 0;
            (fns.get_integerv)(GL_VERTEX_ARRAY_BINDING, &mut prev_vao);

            let vert = compile_shader(&fns, GL_VERTEX_SHADER, VERT_SRC)?;
            let frag = match compile_shader(&fns, GL_FRAGMENT_SHADER, FRAG_SRC) {
                Some(s) => s,
                None => {
                    (fns.delete_shader)(vert);
                    return None;
                }
            };
            let program = (fns.create_program)();
            (fns.attach_shader)(program, vert);
            (fns.attach_shader)(program, frag);
            (fns.link_program)(program);
            (fns.delete_shader)(vert);
            (fns.delete_shader)(frag);
            let mut linked = 0;
            (fns.get_programiv)(program, GL_LINK_STATUS, &mut linked);
            if linked == 0 {
                warn!("overlay program failed to link, overlay drawing disabled");
                return None;
            }

            let u_transform = (fns.get_uniform_location)(program, c"uTransform".as_ptr());
            let u_tex = (fns.get_uniform_location)(program, c"uTex".as_ptr());
            let a_pos = (fns.get_attrib_location)(program, c"aPos".as_ptr());
            let a_uv = (fns.get_attrib_location)(program, c"aUv".as_ptr());
            let a_col = (fns.get_attrib_location)(program, c"aCol".as_ptr());

            let mut vao = 0;
            (fns.gen_vertex_arrays)(1, &mut vao);
            let mut vbo = 0;
            (fns.gen_buffers)(1, &mut vbo);
            let mut ebo = 0;
            (fns.gen_buffers)(1, &mut ebo);

            (fns.bind_vertex_array)(vao);
            (fns.bind_buffer)(GL_ARRAY_BUFFER, vbo);
            (fns.bind_buffer)(GL_ELEMENT_ARRAY_BUFFER, ebo);
            let stride = std::mem::size_of::<DrawVert>() as c_int;
            (fns.enable_vertex_attrib_array)(a_pos as c_uint);
            (fns.vertex_attrib_pointer)(a_pos as c_uint, 2, GL_FLOAT, 0, stride, std::ptr::null());
            (fns.enable_vertex_attrib_array)(a_uv as c_uint);
            (fns.vertex_attrib_pointer)(a_uv as c_uint, 2, GL_FLOAT, 0, stride, 8 as *const c_void);
            (fns.enable_vertex_attrib_array)(a_col as c_uint);
            (fns.vertex_attrib_pointer)(
                a_col as c_uint,
                4,
                GL_UNSIGNED_BYTE,
                1,
                stride,
                16 as *const c_void,
            );
            (fns.bind_vertex_array)(0);

            // The untextured quads sample a single white texel.
            let mut white_tex = 0;
            (fns.gen_textures)(1, &mut white_tex);
            (fns.bind_texture)(GL_TEXTURE_2D, white_tex);
            (fns.tex_parameteri)(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR);
            (fns.tex_parameteri)(GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_LINEAR);
            let texel: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
            (fns.tex_image_2d)(
                GL_TEXTURE_2D,
                0,
                GL_RGBA as c_int,
                1,
                1,
                0,
                GL_RGBA,
                GL_UNSIGNED_BYTE,
                texel.as_ptr() as *const c_void,
            );

            (fns.use_program)(program);
            (fns.uniform_1i)(u_tex, 0);
            (fns.use_program)(0);

            (fns.bind_texture)(GL_TEXTURE_2D, prev_tex as c_uint);
            (fns.bind_buffer)(GL_ARRAY_BUFFER, prev_buf as c_uint);
            (fns.bind_vertex_array)(prev_vao as c_uint);

            Some(GlRenderer {
                fns,
                program,
                u_transform,
                vao,
                vbo,
                ebo,
                white_tex,
            })
        }
    }

    /// Draw the overlay into the current back buffer.
    ///
    /// # Safety
    /// The context the renderer was created against must be current.
    pub unsafe fn render(&self, data: &DrawData) {
        if data.is_empty() || data.display_size[0] <= 0.0 || data.display_size[1] <= 0.0 {
            return;
        }
        let f = &self.fns;
        let saved = unsafe { self.save_state() };

        unsafe {
            (f.enable)(GL_BLEND);
            (f.blend_equation)(GL_FUNC_ADD);
            (f.blend_func)(GL_SRC_ALPHA, GL_ONE_MINUS_SRC_ALPHA);
            (f.disable)(GL_DEPTH_TEST);
            (f.disable)(GL_CULL_FACE);
            (f.enable)(GL_SCISSOR_TEST);

            let fb_w = data.display_size[0];
            let fb_h = data.display_size[1];
            (f.viewport)(0, 0, fb_w as c_int, fb_h as c_int);

            (f.use_program)(self.program);
            let t = clip_transform(data.display_size);
            (f.uniform_4f)(self.u_transform, t[0], t[1], t[2], t[3]);
            (f.active_texture)(GL_TEXTURE0);
            (f.bind_texture)(GL_TEXTURE_2D, self.white_tex);

            (f.bind_vertex_array)(self.vao);
            (f.bind_buffer)(GL_ARRAY_BUFFER, self.vbo);
            (f.buffer_data)(
                GL_ARRAY_BUFFER,
                data.vertex_bytes() as isize,
                data.vertices.as_ptr() as *const c_void,
                GL_STREAM_DRAW,
            );
            (f.bind_buffer)(GL_ELEMENT_ARRAY_BUFFER, self.ebo);
            (f.buffer_data)(
                GL_ELEMENT_ARRAY_BUFFER,
                data.index_bytes() as isize,
                data.indices.as_ptr() as *const c_void,
                GL_STREAM_DRAW,
            );

            for cmd in &data.commands {
                let sb = scissor_box(cmd.clip_min, cmd.clip_max, fb_h);
                (f.scissor)(sb[0], sb[1], sb[2], sb[3]);
                (f.draw_elements)(
                    GL_TRIANGLES,
                    cmd.index_count as c_int,
                    GL_UNSIGNED_SHORT,
                    (cmd.index_offset as usize * std::mem::size_of::<u16>()) as *const c_void,
                );
            }

            self.restore_state(&saved);
        }
    }

    unsafe fn save_state(&self) -> SavedState {
        let f = &self.fns;
        let mut saved = SavedState {
            program: 0,
            texture: 0,
            active_texture: 0,
            array_buffer: 0,
            vertex_array: 0,
            viewport: [0; 4],
            scissor_box: [0; 4],
            blend: false,
            scissor_test: false,
            depth_test: false,
            cull_face: false,
        };
        unsafe {
            (f.get_integerv)(GL_CURRENT_PROGRAM, &mut saved.program);
            (f.get_integerv)(GL_TEXTURE_BINDING_2D, &mut saved.texture);
            (f.get_integerv)(GL_ACTIVE_TEXTURE, &mut saved.active_texture);
            (f.get_integerv)(GL_ARRAY_BUFFER_BINDING, &mut saved.array_buffer);
            (f.get_integerv)(GL_VERTEX_ARRAY_BINDING, &mut saved.vertex_array);
            (f.get_integerv)(crate::glx::GL_VIEWPORT, saved.viewport.as_mut_ptr());
            (f.get_integerv)(crate::glx::GL_SCISSOR_BOX, saved.scissor_box.as_mut_ptr());
            saved.blend = (f.is_enabled)(GL_BLEND) != 0;
            saved.scissor_test = (f.is_enabled)(GL_SCISSOR_TEST) != 0;
            saved.depth_test = (f.is_enabled)(GL_DEPTH_TEST) != 0;
            saved.cull_face = (f.is_enabled)(GL_CULL_FACE) != 0;
        }
        saved
    }

    unsafe fn restore_state(&self, saved: &SavedState) {
        let f = &self.fns;
        unsafe {
            (f.use_program)(saved.program as c_uint);
            (f.active_texture)(saved.active_texture as c_uint);
            (f.bind_texture)(GL_TEXTURE_2D, saved.texture as c_uint);
            (f.bind_vertex_array)(saved.vertex_array as c_uint);
            (f.bind_buffer)(GL_ARRAY_BUFFER, saved.array_buffer as c_uint);
            set_cap(f, GL_BLEND, saved.blend);
            set_cap(f, GL_SCISSOR_TEST, saved.scissor_test);
            set_cap(f, GL_DEPTH_TEST, saved.depth_test);
            set_cap(f, GL_CULL_FACE, saved.cull_face);
            (f.viewport)(
                saved.viewport[0],
                saved.viewport[1],
                saved.viewport[2],
                saved.viewport[3],
            );
            (f.scissor)(
                saved.scissor_box[0],
                saved.scissor_box[1],
                saved.scissor_box[2],
                saved.scissor_box[3],
            );
        }
    }
}

/// Scale and translate the vertex shader applies, `(sx, sy, tx, ty)`:
/// top-left-origin pixels to clip space, with the y axis flipped for GL.
pub fn clip_transform(display_size: [f32; 2]) -> [f32; 4] {
    [
        2.0 / display_size[0],
        -2.0 / display_size[1],
        -1.0,
        1.0,
    ]
}

/// A top-left-origin clip rectangle as the bottom-left-origin box
/// `glScissor` expects, clamped to the framebuffer.
pub fn scissor_box(clip_min: [f32; 2], clip_max: [f32; 2], fb_height: f32) -> [c_int; 4] {
    [
        clip_min[0].max(0.0) as c_int,
        (fb_height - clip_max[1]).max(0.0) as c_int,
        (clip_max[0] - clip_min[0]).max(0.0) as c_int,
        (clip_max[1] - clip_min[1]).max(0.0) as c_int,
    ]
}

unsafe fn set_cap(f: &GlFns, cap: c_uint, on: bool) {
    unsafe {
        if on {
            (f.enable)(cap);
        } else {
            (f.disable)(cap);
        }
    }
}

unsafe fn compile_shader(fns: &GlFns, ty: c_uint, src: &CStr) -> Option<c_uint> {
    unsafe {
        let shader = (fns.create_shader)(ty);
        let sources = [src.as_ptr()];
        (fns.shader_source)(shader, 1, sources.as_ptr(), std::ptr::null());
        (fns.compile_shader)(shader);
        let mut compiled = 0;
        (fns.get_shaderiv)(shader, GL_COMPILE_STATUS, &mut compiled);
        if compiled == 0 {
            warn!("overlay shader failed to compile, overlay drawing disabled");
            (fns.delete_shader)(shader);
            return None;
        }
        Some(shader)
    }
}
