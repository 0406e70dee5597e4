//! Overlay geometry, backend-agnostic.
//!
//! The layer uploads whatever [`DrawData`] an [`OverlayRenderer`] produced
//! for the frame; the built-in [`PlotRenderer`] emits a background quad and
//! a frame-time plot. Vertices are plain POD so the backend can memcpy them
//! into a mapped buffer.

use bytemuck::{Pod, Zeroable};

use crate::config::{HudPosition, OverlayParams};
use crate::stats::FrameStatRing;

/// One overlay vertex: screen-space position, texel coordinate, RGBA8 color.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct DrawVert {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub col: u32,
}

/// One indexed draw with a scissor rectangle, in vertex/index-buffer order.
#[derive(Debug, Clone, Copy)]
pub struct DrawCmd {
    pub clip_min: [f32; 2],
    pub clip_max: [f32; 2],
    pub index_count: u32,
    pub index_offset: u32,
    pub vertex_offset: i32,
}

/// Everything the backend needs to draw one frame of the overlay.
#[derive(Debug, Default)]
pub struct DrawData {
    pub vertices: Vec<DrawVert>,
    pub indices: Vec<u16>,
    pub commands: Vec<DrawCmd>,
    /// Framebuffer extent the clip rectangles were computed against.
    pub display_size: [f32; 2],
}

impl DrawData {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn vertex_bytes(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice())
    }

    pub fn index_bytes(&self) -> usize {
        std::mem::size_of_val(self.indices.as_slice())
    }
}

/// Per-frame numbers handed to the renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameReadout {
    pub fps: f64,
    pub frame_time_us: u64,
    pub cpu_load: f32,
    pub gpu_load: f32,
}

/// Produces overlay geometry for one frame. Implementations must not touch
/// the graphics API; they only append to `DrawData`.
pub trait OverlayRenderer: Send {
    fn render(
        &mut self,
        params: &OverlayParams,
        readout: &FrameReadout,
        ring: &FrameStatRing,
        out: &mut DrawData,
    );
}

/// Number of ring samples the plot shows.
const PLOT_SAMPLES: usize = 120;

/// Frame times at or above this clamp to the top of the plot.
const PLOT_CEILING_US: f32 = 50_000.0;

/// Built-in renderer: translucent background plus a frame-time bar plot.
pub struct PlotRenderer;

impl PlotRenderer {
    fn corner(params: &OverlayParams, display: [f32; 2]) -> [f32; 2] {
        let w = params.width as f32;
        let h = params.height as f32;
        let (ox, oy) = (params.offset_x as f32, params.offset_y as f32);
        match params.position {
            HudPosition::TopLeft => [ox, oy],
            HudPosition::TopRight => [display[0] - w - ox, oy],
            HudPosition::BottomLeft => [ox, display[1] - h - oy],
            HudPosition::BottomRight => [display[0] - w - ox, display[1] - h - oy],
        }
    }
}

fn push_quad(out: &mut DrawData, min: [f32; 2], max: [f32; 2], col: u32) {
    let base = out.vertices.len() as u16;
    out.vertices.extend_from_slice(&[
        DrawVert { pos: [min[0], min[1]], uv: [0.0, 0.0], col },
        DrawVert { pos: [max[0], min[1]], uv: [0.0, 0.0], col },
        DrawVert { pos: [max[0], max[1]], uv: [0.0, 0.0], col },
        DrawVert { pos: [min[0], max[1]], uv: [0.0, 0.0], col },
    ]);
    out.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Convert `0xRRGGBBAA` config colors to the RGBA8 the shader reads, with
/// the background alpha scaled in.
fn pack_color(rgba: u32, alpha_scale: f32) -> u32 {
    let r = (rgba >> 24) & 0xff;
    let g = (rgba >> 16) & 0xff;
    let b = (rgba >> 8) & 0xff;
    let a = ((rgba & 0xff) as f32 * alpha_scale).round().clamp(0.0, 255.0) as u32;
    r | (g << 8) | (b << 16) | (a << 24)
}

impl OverlayRenderer for PlotRenderer {
    fn render(
        &mut self,
        params: &OverlayParams,
        _readout: &FrameReadout,
        ring: &FrameStatRing,
        out: &mut DrawData,
    ) {
        let origin = Self::corner(params, out.display_size);
        let w = params.width as f32;
        let h = params.height as f32;

        let index_start = out.indices.len() as u32;

        push_quad(
            out,
            origin,
            [origin[0] + w, origin[1] + h],
            pack_color(params.colors.background, params.background_alpha),
        );

        if params.enabled.frame_timing {
            let samples = ring.recent(PLOT_SAMPLES);
            let bar_w = w / PLOT_SAMPLES as f32;
            let plot_col = pack_color(params.colors.frametime_plot, 1.0);
            for (i, &us) in samples.iter().enumerate() {
                let t = (us as f32 / PLOT_CEILING_US).min(1.0);
                let bar_h = t * h;
                if bar_h <= 0.0 {
                    continue;
                }
                let x = origin[0] + i as f32 * bar_w;
                push_quad(
                    out,
                    [x, origin[1] + h - bar_h],
                    [x + bar_w, origin[1] + h],
                    plot_col,
                );
            }
        }

        out.commands.push(DrawCmd {
            clip_min: origin,
            clip_max: [origin[0] + w, origin[1] + h],
            index_count: out.indices.len() as u32 - index_start,
            index_offset: index_start,
            // Indices are absolute within the shared vertex buffer.
            vertex_offset: 0,
        });
    }
}
