//! Collaborator services module
//!
//! Clocks, tick schedulers and key-value stores the countdown depends on,
//! each behind a trait so hosts and tests can substitute their own.

pub mod clock;
pub mod scheduler;
pub mod store;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{
    ManualScheduler, ScheduleHandle, ScheduleKind, Scheduler, TokioScheduler, FRAME_INTERVAL,
};
pub use store::{open_file_store, probe_store, FileStore, KeyValueStore, MemoryStore};
