//! State module
//!
//! Timer settings, the pure phase engine and the countdown snapshot type.

pub mod countdown_state;
pub mod phase_state;
pub mod settings;

// Re-export main types
pub use countdown_state::{progress_fraction, CountdownState};
pub use phase_state::{
    advance, initial_state, minutes_to_seconds, phase_duration, round_number,
    should_trigger_long_break, Phase, PhaseMachineState,
};
pub use settings::{clamp_settings, Limit, RawTimerSettings, TimerSettings};
