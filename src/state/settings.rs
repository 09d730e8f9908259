//! Timer settings and their bounds

use serde::{Deserialize, Serialize};

/// Inclusive bounds for one numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub min: u32,
    pub max: u32,
}

impl Limit {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Clamp a raw value into this range. NaN maps to `min`, fractions round.
    pub fn clamp(&self, value: f64) -> u32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(f64::from(self.min), f64::from(self.max)).round() as u32
    }
}

pub const WORK_MINUTES: Limit = Limit::new(1, 180);
pub const SHORT_BREAK_MINUTES: Limit = Limit::new(1, 45);
pub const LONG_BREAK_MINUTES: Limit = Limit::new(5, 90);
pub const LONG_BREAK_INTERVAL: Limit = Limit::new(1, 10);
pub const DAILY_ROUND_TARGET: Limit = Limit::new(1, 16);

/// User configuration consumed by the phase engine.
///
/// Values produced by [`clamp_settings`] are always within their limits. The
/// fields stay public so a host can build unusual settings on purpose, e.g. a
/// `long_break_interval` of 0 to switch long breaks off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_interval: u32,
    pub daily_round_target: u32,
    pub auto_start_work_sessions: bool,
    pub auto_start_breaks: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
            daily_round_target: 8,
            auto_start_work_sessions: true,
            auto_start_breaks: false,
        }
    }
}

/// Unvalidated settings as typed by a user or read from a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimerSettings {
    pub work_minutes: f64,
    pub short_break_minutes: f64,
    pub long_break_minutes: f64,
    pub long_break_interval: f64,
    pub daily_round_target: f64,
    pub auto_start_work_sessions: bool,
    pub auto_start_breaks: bool,
}

impl From<TimerSettings> for RawTimerSettings {
    fn from(settings: TimerSettings) -> Self {
        Self {
            work_minutes: f64::from(settings.work_minutes),
            short_break_minutes: f64::from(settings.short_break_minutes),
            long_break_minutes: f64::from(settings.long_break_minutes),
            long_break_interval: f64::from(settings.long_break_interval),
            daily_round_target: f64::from(settings.daily_round_target),
            auto_start_work_sessions: settings.auto_start_work_sessions,
            auto_start_breaks: settings.auto_start_breaks,
        }
    }
}

impl Default for RawTimerSettings {
    fn default() -> Self {
        TimerSettings::default().into()
    }
}

/// Clamp every numeric field into its limit. Booleans pass through.
pub fn clamp_settings(raw: &RawTimerSettings) -> TimerSettings {
    TimerSettings {
        work_minutes: WORK_MINUTES.clamp(raw.work_minutes),
        short_break_minutes: SHORT_BREAK_MINUTES.clamp(raw.short_break_minutes),
        long_break_minutes: LONG_BREAK_MINUTES.clamp(raw.long_break_minutes),
        long_break_interval: LONG_BREAK_INTERVAL.clamp(raw.long_break_interval),
        daily_round_target: DAILY_ROUND_TARGET.clamp(raw.daily_round_target),
        auto_start_work_sessions: raw.auto_start_work_sessions,
        auto_start_breaks: raw.auto_start_breaks,
    }
}
