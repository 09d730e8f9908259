//! Pomodoro session orchestration
//!
//! Connects the phase engine to a shared countdown: starts each phase with its
//! planned duration, records finished and skipped phases, advances the engine
//! and applies the auto-start settings.

use std::{collections::VecDeque, fmt, sync::Arc};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CountdownLease, CountdownStatus};
use crate::{
    services::{Clock, KeyValueStore, ScheduleHandle},
    state::{clamp_settings, CountdownState, Phase, PhaseMachineState, RawTimerSettings, TimerSettings},
};

/// Records kept in memory; older ones are dropped first.
pub const HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Finished,
    Skipped,
}

/// One phase that ended, either naturally or by skipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub phase: Phase,
    pub outcome: SessionOutcome,
    pub planned_sec: u64,
    pub actual_sec: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub struct PomodoroSession {
    settings: TimerSettings,
    machine: PhaseMachineState,
    lease: CountdownLease,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    machine_key: String,
    phase_started_at: Option<i64>,
    paused_remaining_ms: Option<u64>,
    label: Option<String>,
    history: VecDeque<SessionRecord>,
}

impl fmt::Debug for PomodoroSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PomodoroSession")
            .field("settings", &self.settings)
            .field("machine", &self.machine)
            .field("lease", &self.lease)
            .field("phase_started_at", &self.phase_started_at)
            .field("paused_remaining_ms", &self.paused_remaining_ms)
            .field("history", &self.history.len())
            .finish()
    }
}

impl PomodoroSession {
    /// Build a session on top of `lease`, restoring the phase machine persisted
    /// under `<namespace>:machine` when there is one.
    pub fn new(
        settings: TimerSettings,
        lease: CountdownLease,
        clock: Arc<dyn Clock>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let machine_key = format!("{}:machine", lease.namespace());
        let machine = load_machine(store.as_ref(), &machine_key)
            .unwrap_or_else(|| PhaseMachineState::initial(&settings));

        let phase_started_at = {
            let countdown = lease.lock();
            countdown
                .end_at()
                .map(|end_at| {
                    let duration = i64::try_from(countdown.duration_ms()).unwrap_or(i64::MAX);
                    end_at.saturating_sub(duration)
                })
        };
        if phase_started_at.is_some() {
            info!(
                "Resumed {} phase (round {}) from a previous run",
                machine.phase,
                machine.round_number()
            );
        }

        Self {
            settings,
            machine,
            lease,
            clock,
            store,
            machine_key,
            phase_started_at,
            paused_remaining_ms: None,
            label: None,
            history: VecDeque::new(),
        }
    }

    /// Start the current phase, or resume it when paused. No-op while running.
    pub fn start(&mut self) {
        if self.paused_remaining_ms.is_some() {
            self.resume();
            return;
        }
        if self.lease.lock().is_running() {
            debug!("Start ignored, {} phase already running", self.machine.phase);
            return;
        }

        let duration_ms = self.machine.planned_sec.saturating_mul(1000);
        self.lease.lock().start(duration_ms as i64);
        if self.phase_started_at.is_none() {
            self.phase_started_at = Some(self.clock.now_ms());
        }
        info!(
            "Started {} phase, round {}, {}s planned",
            self.machine.phase,
            self.machine.round_number(),
            self.machine.planned_sec
        );
    }

    /// Stop the countdown and remember how much of the phase is left.
    pub fn pause(&mut self) {
        let mut countdown = self.lease.lock();
        let Some(end_at) = countdown.end_at() else {
            return;
        };
        let remaining = end_at.saturating_sub(self.clock.now_ms()).max(0) as u64;
        if remaining == 0 {
            // Already due; the next tick finishes it.
            return;
        }
        countdown.clear();
        drop(countdown);

        self.paused_remaining_ms = Some(remaining);
        info!("Paused {} phase with {}ms remaining", self.machine.phase, remaining);
    }

    pub fn resume(&mut self) {
        let Some(remaining) = self.paused_remaining_ms.take() else {
            return;
        };
        self.lease.lock().start(remaining as i64);
        info!("Resumed {} phase with {}ms remaining", self.machine.phase, remaining);
    }

    /// Abandon the current phase, record it as skipped and move to the next one.
    /// The next phase is left idle.
    pub fn skip(&mut self) -> SessionRecord {
        let remaining_ms = self.current_remaining_ms();
        self.lease.lock().clear();
        let record = self.record(SessionOutcome::Skipped, remaining_ms);
        self.advance_phase();
        record
    }

    /// Return the current phase to its start without advancing.
    pub fn reset(&mut self) {
        self.lease.lock().clear();
        self.paused_remaining_ms = None;
        self.phase_started_at = None;
        info!("Reset {} phase", self.machine.phase);
    }

    /// Deliver a fired scheduler handle. Returns the record of the phase that
    /// just finished, if any.
    pub fn handle_tick(&mut self, handle: ScheduleHandle) -> Option<SessionRecord> {
        let status = self.lease.lock().tick(handle);
        self.after_status(status)
    }

    pub fn set_visible(&mut self, visible: bool) -> Option<SessionRecord> {
        let status = self.lease.lock().set_visible(visible);
        self.after_status(status)
    }

    fn after_status(&mut self, status: CountdownStatus) -> Option<SessionRecord> {
        if status != CountdownStatus::Completed {
            return None;
        }

        let record = self.record(SessionOutcome::Finished, 0);
        self.advance_phase();
        if self.should_auto_start() {
            self.start();
        }
        Some(record)
    }

    fn should_auto_start(&self) -> bool {
        if self.machine.phase.is_break() {
            self.settings.auto_start_breaks
        } else {
            self.settings.auto_start_work_sessions
        }
    }

    fn current_remaining_ms(&self) -> u64 {
        if let Some(paused) = self.paused_remaining_ms {
            return paused;
        }
        match self.lease.lock().end_at() {
            Some(end_at) => end_at.saturating_sub(self.clock.now_ms()).max(0) as u64,
            None if self.phase_started_at.is_some() => 0,
            None => self.machine.planned_sec.saturating_mul(1000),
        }
    }

    fn record(&mut self, outcome: SessionOutcome, remaining_ms: u64) -> SessionRecord {
        let now = self.clock.now_ms();
        let started = self.phase_started_at.unwrap_or(now);
        let planned_ms = self.machine.planned_sec.saturating_mul(1000);
        let actual_sec = planned_ms.saturating_sub(remaining_ms) / 1000;

        let record = SessionRecord {
            id: format!("ses-{}-{}", self.machine.sequence, started),
            phase: self.machine.phase,
            outcome,
            planned_sec: self.machine.planned_sec,
            actual_sec,
            started_at: to_utc(started),
            ended_at: to_utc(now),
            label: self.label.clone(),
        };

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record.clone());
        info!(
            "{} phase {:?} after {}s of {}s",
            record.phase, record.outcome, record.actual_sec, record.planned_sec
        );
        record
    }

    fn advance_phase(&mut self) {
        self.machine = self.machine.advance(&self.settings);
        self.phase_started_at = None;
        self.paused_remaining_ms = None;
        save_machine(self.store.as_ref(), &self.machine_key, &self.machine);
        debug!(
            "Advanced to {} phase (sequence {}, {} work sessions done)",
            self.machine.phase, self.machine.sequence, self.machine.completed_work_sessions
        );
    }

    /// Apply new settings. The phase in progress keeps its planned duration.
    pub fn update_settings(&mut self, raw: &RawTimerSettings) {
        self.settings = clamp_settings(raw);
        debug!("Settings updated: {:?}", self.settings);
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label.filter(|l| !l.trim().is_empty());
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn machine(&self) -> &PhaseMachineState {
        &self.machine
    }

    /// Phase that follows the current one under the current settings.
    pub fn next_phase(&self) -> Phase {
        self.machine.advance(&self.settings).phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining_ms.is_some()
    }

    pub fn history(&self) -> impl Iterator<Item = &SessionRecord> {
        self.history.iter()
    }

    /// Finished work phases whose end falls on today's local date.
    pub fn rounds_completed_today(&self) -> usize {
        let today = to_utc(self.clock.now_ms()).with_timezone(&Local).date_naive();
        self.history
            .iter()
            .filter(|r| r.phase == Phase::Work && r.outcome == SessionOutcome::Finished)
            .filter(|r| r.ended_at.with_timezone(&Local).date_naive() == today)
            .count()
    }

    pub fn countdown(&self) -> CountdownState {
        let mut state = self.lease.lock().snapshot();
        if let Some(paused) = self.paused_remaining_ms {
            state.remaining_ms = paused;
        }
        state
    }

    pub fn lease(&self) -> &CountdownLease {
        &self.lease
    }

    /// Give the countdown lease back, e.g. to release it to the registry.
    pub fn into_lease(self) -> CountdownLease {
        self.lease
    }
}

fn to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

fn load_machine(store: &dyn KeyValueStore, key: &str) -> Option<PhaseMachineState> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Failed to read phase machine from '{}': {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(machine) => Some(machine),
        Err(e) => {
            warn!("Ignoring unreadable phase machine under '{}': {}", key, e);
            None
        }
    }
}

fn save_machine(store: &dyn KeyValueStore, key: &str, machine: &PhaseMachineState) {
    let result = serde_json::to_string(machine)
        .map_err(crate::error::StoreError::from)
        .and_then(|json| store.set(key, &json));
    if let Err(e) = result {
        warn!("Failed to persist phase machine to '{}': {}", key, e);
    }
}
