//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    state::{clamp_settings, phase_duration, Phase, RawTimerSettings},
    tasks::{CountdownOptions, RunnerOptions},
};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "pomo-clock")]
#[command(about = "A Pomodoro timer that survives restarts and suspension")]
#[command(version)]
pub struct Config {
    /// Focus phase length in minutes (1-180)
    #[arg(short, long, default_value = "25")]
    pub work: f64,

    /// Short break length in minutes (1-45)
    #[arg(long, default_value = "5")]
    pub short_break: f64,

    /// Long break length in minutes (5-90)
    #[arg(long, default_value = "15")]
    pub long_break: f64,

    /// Focus rounds before a long break (1-10)
    #[arg(short, long, default_value = "4")]
    pub interval: f64,

    /// Focus rounds planned per day (1-16)
    #[arg(long, default_value = "8")]
    pub daily_target: f64,

    /// Start focus phases automatically after a break (default)
    #[arg(long, overrides_with = "no_auto_start_work")]
    pub auto_start_work: bool,

    /// Do not start focus phases automatically after a break
    #[arg(long, overrides_with = "auto_start_work")]
    pub no_auto_start_work: bool,

    /// Start breaks automatically after a focus phase
    #[arg(long)]
    pub auto_start_breaks: bool,

    /// File the countdown target and phase state are persisted to
    #[arg(long, default_value = "pomo-clock.json")]
    pub state_file: PathBuf,

    /// Store namespace for this timer
    #[arg(long, default_value = "pomodoro")]
    pub namespace: String,

    /// Recompute interval in milliseconds while running headless
    #[arg(long, default_value = "500")]
    pub slow_tick_ms: u64,

    /// Run without a live display; uses the slow recompute interval
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many phases have finished
    #[arg(short, long)]
    pub cycles: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Settings as given on the command line, before clamping
    pub fn raw_settings(&self) -> RawTimerSettings {
        RawTimerSettings {
            work_minutes: self.work,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            long_break_interval: self.interval,
            daily_round_target: self.daily_target,
            auto_start_work_sessions: self.auto_start_work || !self.no_auto_start_work,
            auto_start_breaks: self.auto_start_breaks,
        }
    }

    pub fn countdown_options(&self) -> CountdownOptions {
        CountdownOptions {
            namespace: self.namespace.clone(),
            slow_interval: Duration::from_millis(self.slow_tick_ms.max(1)),
            initial_duration_ms: phase_duration(
                Phase::Work,
                &clamp_settings(&self.raw_settings()),
            ) * 1000,
            visible: !self.headless,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            cycles: self.cycles,
            ..RunnerOptions::default()
        }
    }
}
