//! Integration test: GL backend coordinate math
//!
//! Run with: cargo test --test render_test -- --nocapture

use glimpse_gl_shim::render::{clip_transform, scissor_box};

#[test]
fn test_clip_transform_maps_corners_to_ndc() {
    let t = clip_transform([1920.0, 1080.0]);

    // Top-left pixel lands at (-1, 1), bottom-right at (1, -1): the y
    // axis flips because GL clip space points up.
    let apply = |x: f32, y: f32| (x * t[0] + t[2], y * t[1] + t[3]);
    let tl = apply(0.0, 0.0);
    if tl != (-1.0, 1.0) {
        panic!("expected the origin at (-1, 1), got {:?}", tl);
    }
    let br = apply(1920.0, 1080.0);
    if br != (1.0, -1.0) {
        panic!("expected the far corner at (1, -1), got {:?}", br);
    }
}

#[test]
fn test_scissor_box_flips_to_bottom_left_origin() {
    // A 300x200 rectangle near the top-left of a 1080-tall framebuffer.
    let sb = scissor_box([20.0, 20.0], [320.0, 220.0], 1080.0);
    if sb != [20, 860, 300, 200] {
        panic!("expected [20, 860, 300, 200], got {:?}", sb);
    }
}

#[test]
fn test_scissor_box_clamps_offscreen_rect() {
    // A rectangle hanging off the left edge keeps a non-negative origin
    // and never reports a negative extent.
    let sb = scissor_box([-50.0, 1100.0], [-10.0, 1050.0], 1080.0);
    if sb[0] < 0 || sb[1] < 0 || sb[2] < 0 || sb[3] < 0 {
        panic!("expected a clamped scissor box, got {:?}", sb);
    }
}
