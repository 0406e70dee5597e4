//! Shared utilities for the glimpse overlay: logging setup, monotonic time,
//! process identification.

pub mod logging;
pub mod process;
pub mod time;
