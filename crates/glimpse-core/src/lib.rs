//! glimpse-core: the interception-independent heart of the overlay.
//!
//! Everything here is driver-agnostic: handle registries, frame timing
//! statistics, session logging, frame pacing, the control protocol, and the
//! plans the present hook executes (draw-record reuse, submission strategy).
//! The Vulkan layer and GL shim crates are thin adapters over this one.

pub mod config;
pub mod control;
pub mod draw;
pub mod draw_pool;
pub mod engine;
pub mod error;
pub mod pacer;
pub mod registry;
pub mod session;
pub mod session_log;
pub mod sources;
pub mod stats;
pub mod submit;
pub mod telemetry;

pub use error::CoreError;
