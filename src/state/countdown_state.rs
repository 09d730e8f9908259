//! Countdown runtime snapshot

use serde::Serialize;

use crate::utils::{ceil_seconds, format_duration};

/// Point-in-time view of a countdown, as observed by a host.
///
/// `remaining_ms` is derived from `end_at` and the clock at the moment the
/// snapshot was taken; `end_at` is the only authoritative value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    pub end_at: Option<i64>,
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub is_running: bool,
    pub progress: f64,
}

impl CountdownState {
    pub fn remaining_seconds(&self) -> u64 {
        ceil_seconds(self.remaining_ms)
    }

    /// `MM:SS` rendering of the remaining time
    pub fn formatted(&self) -> String {
        format_duration(self.remaining_seconds() as i64)
    }
}

/// `clamp(1 - remaining / total, 0, 1)`, with `total` falling back to
/// `fallback_ms` until a run has established a duration.
pub fn progress_fraction(remaining_ms: u64, duration_ms: u64, fallback_ms: u64) -> f64 {
    let total = if duration_ms > 0 { duration_ms } else { fallback_ms };
    if total == 0 {
        return 0.0;
    }
    (1.0 - remaining_ms as f64 / total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_snapshot_formats_as_zero() {
        let state = CountdownState {
            end_at: None,
            duration_ms: 1500,
            remaining_ms: 0,
            is_running: false,
            progress: 0.0,
        };
        assert_eq!(state.formatted(), "00:00");
        assert!(!state.is_running);
    }

    #[test]
    fn progress_uses_fallback_before_first_run() {
        assert_eq!(progress_fraction(0, 0, 0), 0.0);
        assert_eq!(progress_fraction(500, 0, 1000), 0.5);
        assert_eq!(progress_fraction(250, 1000, 5000), 0.75);
        assert_eq!(progress_fraction(2000, 1000, 0), 0.0);
    }
}
