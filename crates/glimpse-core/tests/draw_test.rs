//! Integration test: overlay geometry
//!
//! Feeds the plot renderer a synthetic ring and checks the emitted
//! vertices, indices and clip rectangles.
//!
//! Run with: cargo test --test draw_test -- --nocapture

use glimpse_core::config::{HudPosition, OverlayParams};
use glimpse_core::draw::{DrawData, FrameReadout, OverlayRenderer, PlotRenderer};
use glimpse_core::stats::FrameStatRing;

fn render(params: &OverlayParams, ring: &FrameStatRing) -> DrawData {
    let mut out = DrawData {
        display_size: [1920.0, 1080.0],
        ..Default::default()
    };
    PlotRenderer.render(params, &FrameReadout::default(), ring, &mut out);
    out
}

#[test]
fn test_background_quad_always_present() {
    let params = OverlayParams::default();
    let ring = FrameStatRing::new();
    let out = render(&params, &ring);

    if out.is_empty() {
        panic!("expected geometry even with an empty ring");
    }
    // Empty ring: the background quad and nothing else.
    if out.vertices.len() != 4 || out.indices.len() != 6 {
        panic!(
            "expected one quad, got {} vertices / {} indices",
            out.vertices.len(),
            out.indices.len()
        );
    }
    match out.commands.as_slice() {
        [cmd] => {
            if cmd.index_count != 6 || cmd.index_offset != 0 {
                panic!("expected one 6-index command, got {:?}", cmd);
            }
        }
        other => panic!("expected one command, got {}", other.len()),
    }
}

#[test]
fn test_plot_bars_track_the_ring() {
    let params = OverlayParams::default();
    let mut ring = FrameStatRing::new();
    for _ in 0..8 {
        ring.push(Some(16_000));
    }
    let out = render(&params, &ring);

    // Background plus one bar per nonzero sample.
    if out.vertices.len() != 4 * 9 {
        panic!("expected 9 quads, got {} vertices", out.vertices.len());
    }
    // All indices must stay within the vertex buffer.
    let max_index = out.indices.iter().copied().max().unwrap_or(0) as usize;
    if max_index >= out.vertices.len() {
        panic!("expected indices within {} vertices, got {}", out.vertices.len(), max_index);
    }
}

#[test]
fn test_geometry_stays_inside_the_clip() {
    let mut params = OverlayParams::default();
    params.position = HudPosition::BottomRight;
    let mut ring = FrameStatRing::new();
    ring.push(Some(20_000));
    ring.push(Some(200_000)); // Above the plot ceiling, clamps to full height.

    let out = render(&params, &ring);
    let cmd = &out.commands[0];

    // Anchored bottom-right of a 1920x1080 display.
    if cmd.clip_max != [1920.0, 1080.0] {
        panic!("expected clip_max at the display corner, got {:?}", cmd.clip_max);
    }
    for v in &out.vertices {
        if v.pos[0] < cmd.clip_min[0] - 0.5
            || v.pos[0] > cmd.clip_max[0] + 0.5
            || v.pos[1] < cmd.clip_min[1] - 0.5
            || v.pos[1] > cmd.clip_max[1] + 0.5
        {
            panic!("expected vertex inside the clip, got {:?} vs {:?}", v.pos, cmd);
        }
    }
}

#[test]
fn test_disabling_frame_timing_drops_the_plot() {
    let mut params = OverlayParams::default();
    params.enabled.frame_timing = false;
    let mut ring = FrameStatRing::new();
    for _ in 0..8 {
        ring.push(Some(16_000));
    }
    let out = render(&params, &ring);
    if out.vertices.len() != 4 {
        panic!("expected only the background quad, got {} vertices", out.vertices.len());
    }
}

#[test]
fn test_clear_resets_geometry_but_not_display_size() {
    let params = OverlayParams::default();
    let ring = FrameStatRing::new();
    let mut out = render(&params, &ring);
    out.clear();
    if !out.is_empty() || !out.vertices.is_empty() || !out.indices.is_empty() {
        panic!("expected empty geometry after clear");
    }
    if out.display_size != [1920.0, 1080.0] {
        panic!("expected display size preserved, got {:?}", out.display_size);
    }
}

#[test]
fn test_buffer_byte_sizes() {
    let params = OverlayParams::default();
    let ring = FrameStatRing::new();
    let out = render(&params, &ring);
    // DrawVert is 2+2 f32 plus an RGBA8 word.
    if out.vertex_bytes() != out.vertices.len() * 20 {
        panic!("expected {} vertex bytes, got {}", out.vertices.len() * 20, out.vertex_bytes());
    }
    if out.index_bytes() != out.indices.len() * 2 {
        panic!("expected {} index bytes, got {}", out.indices.len() * 2, out.index_bytes());
    }
}
