//! Pomo Clock - A Pomodoro phase engine with a reload-safe countdown
//!
//! This library provides the pure phase state machine (focus, short break,
//! long break) and a countdown anchored to absolute wall-clock time, persisted
//! through a pluggable key-value store so progress survives restarts and
//! suspension.

pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::StoreError;
pub use state::{clamp_settings, Phase, PhaseMachineState, RawTimerSettings, TimerSettings};
pub use tasks::{Countdown, CountdownOptions, CountdownRegistry, PomodoroSession};
pub use utils::{format_duration, shutdown_signal};
