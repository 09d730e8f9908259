//! Wall-clock anchored countdown
//!
//! Remaining time is always `end_at - now`, never a decremented counter, so a
//! countdown that was suspended, backgrounded or reloaded picks up exactly
//! where wall-clock time says it should be. `end_at` and the run duration are
//! mirrored to a [`KeyValueStore`] under `<namespace>` and
//! `<namespace>:duration`.

use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, info, trace, warn};

use crate::{
    services::{Clock, KeyValueStore, ScheduleHandle, Scheduler},
    state::{progress_fraction, CountdownState},
    utils::{ceil_seconds, format_duration},
};

pub const DEFAULT_NAMESPACE: &str = "countdown:endAt";
pub const DEFAULT_SLOW_INTERVAL: Duration = Duration::from_millis(500);

/// Completion sink, invoked at most once per run.
pub type OnDone = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone)]
pub struct CountdownOptions {
    /// Store key for the end timestamp; the duration lives at `<namespace>:duration`.
    pub namespace: String,
    /// Reschedule delay while hidden.
    pub slow_interval: Duration,
    /// Progress denominator before any run has set a duration.
    pub initial_duration_ms: u64,
    pub visible: bool,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            slow_interval: DEFAULT_SLOW_INTERVAL,
            initial_duration_ms: 0,
            visible: true,
        }
    }
}

impl CountdownOptions {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn duration_key(&self) -> String {
        format!("{}:duration", self.namespace)
    }
}

/// Coarse lifecycle reported after each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    Idle,
    Running,
    /// This call completed the run and fired the sink.
    Completed,
}

pub struct Countdown {
    options: CountdownOptions,
    duration_key: String,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<dyn Scheduler>,
    end_at: Option<i64>,
    duration_ms: u64,
    remaining_ms: u64,
    visible: bool,
    pending: Option<ScheduleHandle>,
    done_fired: bool,
    on_done: Option<OnDone>,
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("namespace", &self.options.namespace)
            .field("end_at", &self.end_at)
            .field("duration_ms", &self.duration_ms)
            .field("remaining_ms", &self.remaining_ms)
            .field("visible", &self.visible)
            .field("pending", &self.pending)
            .field("done_fired", &self.done_fired)
            .finish()
    }
}

impl Countdown {
    /// Build a countdown, resuming a persisted run if its end is still ahead.
    ///
    /// A persisted run that already elapsed is discarded without firing the
    /// completion sink.
    pub fn new(
        options: CountdownOptions,
        clock: Arc<dyn Clock>,
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let duration_key = options.duration_key();
        let visible = options.visible;
        let mut countdown = Self {
            duration_ms: options.initial_duration_ms,
            options,
            duration_key,
            clock,
            store,
            scheduler,
            end_at: None,
            remaining_ms: 0,
            visible,
            pending: None,
            done_fired: false,
            on_done: None,
        };
        countdown.restore();
        countdown
    }

    /// Attach the completion sink.
    pub fn with_on_done<F>(mut self, on_done: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_done = Some(Box::new(on_done));
        self
    }

    fn restore(&mut self) {
        let stored_end = self.read_stored(&self.options.namespace);
        let stored_duration = self.read_stored(&self.duration_key);

        if let Some(duration) = stored_duration.filter(|d| *d > 0) {
            self.duration_ms = duration as u64;
        }

        let now = self.clock.now_ms();
        match stored_end {
            Some(end_at) if end_at > now => {
                self.end_at = Some(end_at);
                self.remaining_ms = (end_at - now) as u64;
                info!(
                    "Resuming countdown '{}' with {}ms remaining",
                    self.options.namespace, self.remaining_ms
                );
                self.schedule_next();
            }
            Some(end_at) => {
                debug!(
                    "Discarding elapsed countdown '{}' (ended {}ms ago)",
                    self.options.namespace,
                    now.saturating_sub(end_at)
                );
                self.clear_storage();
            }
            None => {
                if stored_duration.is_some() {
                    self.clear_storage();
                }
            }
        }
    }

    /// Begin a new run of `duration_ms`, superseding any run in progress.
    ///
    /// A non-positive duration is logged and ignored.
    pub fn start(&mut self, duration_ms: i64) {
        if duration_ms <= 0 {
            warn!(
                "Countdown '{}' start called without a positive duration ({}ms)",
                self.options.namespace, duration_ms
            );
            return;
        }

        let Some(end_at) = self.clock.now_ms().checked_add(duration_ms) else {
            warn!(
                "Countdown '{}' duration of {}ms is out of range, ignoring start",
                self.options.namespace, duration_ms
            );
            return;
        };

        self.cancel_pending();
        self.end_at = Some(end_at);
        self.duration_ms = duration_ms as u64;
        self.remaining_ms = duration_ms as u64;
        self.done_fired = false;

        self.write_stored(&self.options.namespace, Some(end_at));
        self.write_stored(&self.duration_key, Some(duration_ms));
        debug!(
            "Countdown '{}' started for {}ms, ends at {}",
            self.options.namespace, duration_ms, end_at
        );

        self.schedule_next();
    }

    /// Stop without completing. The sink is not invoked.
    pub fn clear(&mut self) {
        self.cancel_pending();
        self.clear_storage();
        self.end_at = None;
        self.remaining_ms = 0;
        self.done_fired = false;
        debug!("Countdown '{}' cleared", self.options.namespace);
    }

    /// Cancel pending work before the owner goes away. The persisted target
    /// is kept so a later instance resumes the run.
    pub fn teardown(&mut self) {
        self.cancel_pending();
        debug!("Countdown '{}' torn down", self.options.namespace);
    }

    /// Deliver a fired schedule handle. Handles other than the one currently
    /// awaited are stale and ignored.
    pub fn tick(&mut self, handle: ScheduleHandle) -> CountdownStatus {
        if self.pending != Some(handle) {
            trace!(
                "Countdown '{}' ignoring stale handle {}",
                self.options.namespace,
                handle.id()
            );
            return self.status();
        }
        self.pending = None;
        self.recompute_and_reschedule()
    }

    /// Recompute immediately, outside the schedule.
    pub fn recompute(&mut self) -> CountdownStatus {
        self.cancel_pending();
        self.recompute_and_reschedule()
    }

    /// Visibility changed. Becoming visible recomputes at once to correct any
    /// drift from the coarse hidden-page interval.
    pub fn set_visible(&mut self, visible: bool) -> CountdownStatus {
        if self.visible == visible {
            return self.status();
        }
        self.visible = visible;
        debug!(
            "Countdown '{}' is now {}",
            self.options.namespace,
            if visible { "visible" } else { "hidden" }
        );

        if visible {
            return self.recompute();
        }
        if self.pending.is_some() {
            self.cancel_pending();
            self.schedule_next();
        }
        self.status()
    }

    fn recompute_and_reschedule(&mut self) -> CountdownStatus {
        let Some(end_at) = self.end_at else {
            self.remaining_ms = 0;
            return CountdownStatus::Idle;
        };

        self.remaining_ms = end_at.saturating_sub(self.clock.now_ms()).max(0) as u64;
        if self.remaining_ms > 0 {
            self.schedule_next();
            return CountdownStatus::Running;
        }
        self.complete()
    }

    fn complete(&mut self) -> CountdownStatus {
        self.cancel_pending();
        self.clear_storage();
        self.end_at = None;
        self.remaining_ms = 0;

        if self.done_fired {
            return CountdownStatus::Idle;
        }
        self.done_fired = true;
        info!("Countdown '{}' completed", self.options.namespace);
        if let Some(on_done) = self.on_done.as_mut() {
            on_done();
        }
        CountdownStatus::Completed
    }

    fn schedule_next(&mut self) {
        let handle = if self.visible {
            self.scheduler.schedule_fast()
        } else {
            self.scheduler.schedule_slow(self.options.slow_interval)
        };
        self.pending = Some(handle);
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn clear_storage(&self) {
        self.write_stored(&self.options.namespace, None);
        self.write_stored(&self.duration_key, None);
    }

    fn read_stored(&self, key: &str) -> Option<i64> {
        match self.store.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring unparsable countdown value under '{}': {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read countdown storage '{}': {}", key, e);
                None
            }
        }
    }

    fn write_stored(&self, key: &str, value: Option<i64>) {
        let result = match value {
            Some(value) => self.store.set(key, &value.to_string()),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            warn!("Failed to write countdown storage '{}': {}", key, e);
        }
    }

    pub fn status(&self) -> CountdownStatus {
        if self.is_running() {
            CountdownStatus::Running
        } else {
            CountdownStatus::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.end_at.is_some() && self.remaining_ms > 0
    }

    pub fn end_at(&self) -> Option<i64> {
        self.end_at
    }

    /// Duration of the current (or last) run, or the initial duration before any run.
    pub fn duration_ms(&self) -> u64 {
        if self.duration_ms > 0 {
            self.duration_ms
        } else {
            self.options.initial_duration_ms
        }
    }

    /// Remaining time as of the last recompute.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn remaining_seconds(&self) -> u64 {
        ceil_seconds(self.remaining_ms)
    }

    pub fn formatted(&self) -> String {
        format_duration(self.remaining_seconds() as i64)
    }

    pub fn progress(&self) -> f64 {
        progress_fraction(
            self.remaining_ms,
            self.duration_ms,
            self.options.initial_duration_ms,
        )
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn namespace(&self) -> &str {
        &self.options.namespace
    }

    pub fn snapshot(&self) -> CountdownState {
        CountdownState {
            end_at: self.end_at,
            duration_ms: self.duration_ms(),
            remaining_ms: self.remaining_ms,
            is_running: self.is_running(),
            progress: self.progress(),
        }
    }
}
