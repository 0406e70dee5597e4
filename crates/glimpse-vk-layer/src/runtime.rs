//! Process-wide layer state.
//!
//! Everything the layer knows lives behind one [`Runtime`] value created on
//! the first `vkCreateInstance` and reachable from every entry point. All
//! handle lookups go through its registries; no entry point keeps state of
//! its own. The non-Vulkan half (config, telemetry, capture, control) is
//! an [`OverlaySession`] the runtime derefs to.

use std::ops::Deref;
use std::sync::OnceLock;

use glimpse_core::registry::HandleRegistry;
use glimpse_core::session::OverlaySession;

use crate::device::{CommandBufferState, DeviceState, QueueState};
use crate::instance::InstanceState;
use crate::swapchain::SwapchainState;

pub struct Runtime {
    session: OverlaySession,

    pub instances: HandleRegistry<InstanceState>,
    pub devices: HandleRegistry<DeviceState>,
    pub queues: HandleRegistry<QueueState>,
    pub command_buffers: HandleRegistry<CommandBufferState>,
    pub swapchains: HandleRegistry<SwapchainState>,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

impl Runtime {
    /// The singleton, built on first use.
    pub fn get() -> &'static Runtime {
        RUNTIME.get_or_init(Runtime::new)
    }

    fn new() -> Self {
        Self {
            session: OverlaySession::init(),
            instances: HandleRegistry::new(),
            devices: HandleRegistry::new(),
            queues: HandleRegistry::new(),
            command_buffers: HandleRegistry::new(),
            swapchains: HandleRegistry::new(),
        }
    }
}

impl Deref for Runtime {
    type Target = OverlaySession;

    fn deref(&self) -> &OverlaySession {
        &self.session
    }
}
