#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A graphics driver call returned a non-success code. Logged and
    /// tolerated everywhere except swapchain setup.
    #[error("driver call {call} failed with code {code}")]
    DriverCall { call: &'static str, code: i32 },

    /// A handle the application is actively using has no live context.
    /// Invariant violation; fatal for the call path that hit it.
    #[error("no live context for handle {0:#x}")]
    HandleNotFound(u64),

    /// Resource creation during swapchain setup failed. The overlay is
    /// disabled for that swapchain; the application is unaffected.
    #[error("swapchain overlay setup failed: {0}")]
    SwapchainSetup(String),

    /// A telemetry backend stopped answering; its metric category is
    /// disabled for the rest of the session.
    #[error("telemetry source unavailable: {0}")]
    TelemetryUnavailable(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
