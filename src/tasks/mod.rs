//! Timer tasks module
//!
//! The countdown itself, the registry that shares it, the Pomodoro session
//! that drives it, and the async runner used by the binary.

pub mod countdown;
pub mod registry;
pub mod runner;
pub mod session;

// Re-export main types
pub use countdown::{
    Countdown, CountdownOptions, CountdownStatus, OnDone, DEFAULT_NAMESPACE, DEFAULT_SLOW_INTERVAL,
};
pub use registry::{CountdownLease, CountdownRegistry};
pub use runner::{session_runner_task, Command, RunnerOptions};
pub use session::{PomodoroSession, SessionOutcome, SessionRecord, HISTORY_LIMIT};
