//! Pomodoro phase engine
//!
//! A pure state machine: every function here is deterministic and free of I/O.
//! Transitions produce a new [`PhaseMachineState`] value; nothing is updated in place.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TimerSettings;

/// The activity currently being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "work")]
    Work,
    #[serde(rename = "short")]
    ShortBreak,
    #[serde(rename = "long")]
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }

    /// Human label used in logs and status lines.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Engine state. `planned_sec` is fixed when the phase starts, so later
/// settings changes never stretch or shrink an in-progress phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMachineState {
    pub phase: Phase,
    pub sequence: u64,
    pub completed_work_sessions: u32,
    pub planned_sec: u64,
}

impl PhaseMachineState {
    /// Fresh machine at the first work phase.
    pub fn initial(settings: &TimerSettings) -> Self {
        Self {
            phase: Phase::Work,
            sequence: 1,
            completed_work_sessions: 0,
            planned_sec: phase_duration(Phase::Work, settings),
        }
    }

    /// The only transition: work goes to a break, a break goes back to work.
    pub fn advance(&self, settings: &TimerSettings) -> Self {
        match self.phase {
            Phase::Work => {
                let completed_work_sessions = self.completed_work_sessions.saturating_add(1);
                let phase = if should_trigger_long_break(
                    completed_work_sessions,
                    settings.long_break_interval,
                ) {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                };
                Self {
                    phase,
                    sequence: self.sequence + 1,
                    completed_work_sessions,
                    planned_sec: phase_duration(phase, settings),
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Self {
                phase: Phase::Work,
                sequence: self.sequence + 1,
                completed_work_sessions: self.completed_work_sessions,
                planned_sec: phase_duration(Phase::Work, settings),
            },
        }
    }

    /// One-based number of the work round in progress or coming up next.
    pub fn round_number(&self) -> u32 {
        round_number(self.completed_work_sessions)
    }
}

pub fn initial_state(settings: &TimerSettings) -> PhaseMachineState {
    PhaseMachineState::initial(settings)
}

pub fn advance(state: &PhaseMachineState, settings: &TimerSettings) -> PhaseMachineState {
    state.advance(settings)
}

/// Length of `phase` in seconds under `settings`.
pub fn phase_duration(phase: Phase, settings: &TimerSettings) -> u64 {
    let minutes = match phase {
        Phase::Work => settings.work_minutes,
        Phase::ShortBreak => settings.short_break_minutes,
        Phase::LongBreak => settings.long_break_minutes,
    };
    minutes_to_seconds(f64::from(minutes))
}

/// Rounds to the nearest second and floors at zero.
pub fn minutes_to_seconds(minutes: f64) -> u64 {
    let seconds = (minutes * 60.0).round();
    if seconds.is_nan() || seconds <= 0.0 {
        0
    } else {
        seconds as u64
    }
}

/// An interval of 0 switches long breaks off.
pub fn should_trigger_long_break(completed_work_sessions: u32, interval: u32) -> bool {
    if interval == 0 {
        return false;
    }
    completed_work_sessions > 0 && completed_work_sessions % interval == 0
}

pub fn round_number(completed_work_sessions: u32) -> u32 {
    completed_work_sessions.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings_with_interval(interval: u32) -> TimerSettings {
        TimerSettings {
            long_break_interval: interval,
            ..TimerSettings::default()
        }
    }

    #[test]
    fn initial_state_starts_at_first_work_phase() {
        let state = initial_state(&TimerSettings::default());
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.sequence, 1);
        assert_eq!(state.completed_work_sessions, 0);
        assert_eq!(state.planned_sec, 1500);
        assert_eq!(state.round_number(), 1);
    }

    #[test]
    fn rotates_phases_and_schedules_long_breaks() {
        let settings = TimerSettings::default();
        let mut state = initial_state(&settings);

        state = advance(&state, &settings);
        assert_eq!(state.phase, Phase::ShortBreak);
        assert_eq!(state.completed_work_sessions, 1);
        assert_eq!(state.planned_sec, 300);

        state = advance(&state, &settings);
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.completed_work_sessions, 1);

        state.completed_work_sessions = settings.long_break_interval - 1;
        let next = advance(&state, &settings);
        assert_eq!(next.phase, Phase::LongBreak);
        assert_eq!(next.planned_sec, 900);
    }

    #[test]
    fn planned_duration_is_taken_from_settings_at_transition() {
        let settings = TimerSettings::default();
        let state = initial_state(&settings);

        let longer = TimerSettings {
            short_break_minutes: 10,
            ..settings
        };
        assert_eq!(state.planned_sec, 1500);
        assert_eq!(advance(&state, &longer).planned_sec, 600);
    }

    #[test]
    fn detects_long_break_trigger() {
        assert!(should_trigger_long_break(4, 4));
        assert!(!should_trigger_long_break(3, 4));
        assert!(!should_trigger_long_break(0, 4));
        assert!(!should_trigger_long_break(4, 0));
    }

    #[test]
    fn minutes_to_seconds_rounds_and_floors() {
        assert_eq!(minutes_to_seconds(25.0), 1500);
        assert_eq!(minutes_to_seconds(0.5), 30);
        assert_eq!(minutes_to_seconds(0.0083), 0);
        assert_eq!(minutes_to_seconds(-3.0), 0);
        assert_eq!(minutes_to_seconds(f64::NAN), 0);
    }

    #[test]
    fn zero_interval_disables_long_breaks() {
        let settings = settings_with_interval(0);
        let mut state = initial_state(&settings);
        for _ in 0..50 {
            state = advance(&state, &settings);
            assert_eq!(state.phase, Phase::ShortBreak);
            state = advance(&state, &settings);
            assert_eq!(state.phase, Phase::Work);
        }
        assert_eq!(state.completed_work_sessions, 50);
    }

    #[test]
    fn phase_state_serializes_with_short_phase_names() {
        let state = advance(&initial_state(&TimerSettings::default()), &TimerSettings::default());
        let json = serde_json::to_string(&state).expect("serialize state");
        assert!(json.contains(r#""phase":"short""#));
        assert!(json.contains(r#""completedWorkSessions":1"#));
    }

    proptest! {
        #[test]
        fn long_break_lands_on_every_nth_work_phase(interval in 1u32..=10u32, rounds in 1u32..40u32) {
            let settings = settings_with_interval(interval);
            let mut state = initial_state(&settings);
            let mut last_completed = 0;

            for round in 1..=rounds {
                prop_assert_eq!(state.phase, Phase::Work);
                state = advance(&state, &settings);
                prop_assert_eq!(state.completed_work_sessions, round);
                prop_assert!(state.completed_work_sessions >= last_completed);
                last_completed = state.completed_work_sessions;

                let expected = if round % interval == 0 { Phase::LongBreak } else { Phase::ShortBreak };
                prop_assert_eq!(state.phase, expected);

                state = advance(&state, &settings);
                prop_assert_eq!(state.completed_work_sessions, round);
            }
            prop_assert_eq!(state.sequence, 1 + 2 * u64::from(rounds));
        }

        #[test]
        fn break_always_returns_to_work(
            completed in 0u32..1000u32,
            long in any::<bool>(),
            interval in 0u32..=10u32
        ) {
            let settings = settings_with_interval(interval);
            let phase = if long { Phase::LongBreak } else { Phase::ShortBreak };
            let state = PhaseMachineState {
                phase,
                sequence: 7,
                completed_work_sessions: completed,
                planned_sec: 60,
            };

            let next = advance(&state, &settings);
            prop_assert_eq!(next.phase, Phase::Work);
            prop_assert_eq!(next.completed_work_sessions, completed);
            prop_assert_eq!(next.sequence, 8);
            prop_assert_eq!(next.planned_sec, phase_duration(Phase::Work, &settings));
        }
    }
}
