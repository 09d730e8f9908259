//! Utility functions module
//!
//! This module contains utility functions used throughout the application.

pub mod format;
pub mod signals;

// Re-export main functions
pub use format::{ceil_seconds, format_duration};
pub use signals::shutdown_signal;
