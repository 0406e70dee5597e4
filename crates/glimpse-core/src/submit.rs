//! Queue submission strategy for the overlay draw.
//!
//! The draw command buffer always runs on the graphics queue. When the
//! application presents from that same queue, the draw simply takes over
//! the present's wait semaphores. When it presents from a different queue
//! with no wait semaphores of its own, ordering needs an empty submission
//! on the present queue that signals a handoff semaphore for the graphics
//! queue to wait on. In every case the patched present waits only on the
//! draw's signal semaphore.

/// How to order the overlay draw against the application's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPlan {
    /// One submission on the graphics queue. It waits on the semaphores
    /// the application passed to present and signals the draw semaphore.
    Direct,
    /// Two submissions: an empty one on the present queue signaling the
    /// handoff semaphore, then the draw on the graphics queue waiting on
    /// it and signaling the draw semaphore.
    CrossQueueHandoff,
}

/// Pick the plan for one present call.
pub fn plan(present_queue_is_graphics: bool, wait_semaphore_count: u32) -> SubmitPlan {
    if !present_queue_is_graphics && wait_semaphore_count == 0 {
        SubmitPlan::CrossQueueHandoff
    } else {
        SubmitPlan::Direct
    }
}

/// What the hook does to the application's `VkPresentInfoKHR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentRewrite {
    /// Pass the application's struct to the driver untouched, extension
    /// chain and result slots included.
    Forward,
    /// Copy the struct (keeping its p_next chain), narrow it to one
    /// swapchain and swap the wait list for the draw semaphore.
    Narrow,
}

/// A present is only rewritten when it has to be: the overlay drew into
/// the image, or the call spans several swapchains and must be split.
pub fn present_rewrite(swapchain_count: u32, drew_overlay: bool) -> PresentRewrite {
    if swapchain_count == 1 && !drew_overlay {
        PresentRewrite::Forward
    } else {
        PresentRewrite::Narrow
    }
}
