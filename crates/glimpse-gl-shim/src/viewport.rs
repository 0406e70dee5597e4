//! Output-size inference for GL clients.
//!
//! GL has no swapchain to ask, so the overlay sizes itself from the
//! viewport and scissor state left behind by the frame. Some engines
//! render the final blit with a viewport larger than the window and carve
//! the real output with the scissor box, so a plausible scissor wins over
//! the viewport.

/// Rectangles as GL reports them: x, y, width, height.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizeInference {
    last_viewport: [i32; 4],
    last_scissor: [i32; 4],
    size: (u32, u32),
}

impl SizeInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the output size for this frame and remember the state for
    /// the next one. The size is sticky: when neither rectangle moved, the
    /// previously applied one stands.
    pub fn infer(&mut self, viewport: [i32; 4], scissor: [i32; 4]) -> (u32, u32) {
        // A 1x1 scissor is a cleared-state artifact, never a real output.
        let invalid_scissor = scissor[2] == 1 && scissor[3] == 1;

        if viewport != self.last_viewport || invalid_scissor {
            self.size = (viewport[2].max(0) as u32, viewport[3].max(0) as u32);
        }
        // The scissor wins when it changed this frame, or when it matches
        // what the viewport was a frame ago (engines that set the scissor
        // one frame behind the blit, e.g. openmw).
        if !invalid_scissor && (scissor != self.last_scissor || scissor == self.last_viewport) {
            self.size = (scissor[2].max(0) as u32, scissor[3].max(0) as u32);
        }

        self.last_viewport = viewport;
        self.last_scissor = scissor;
        self.size
    }
}
