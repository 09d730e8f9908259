//! Pomo Clock - A Pomodoro timer that survives restarts and suspension
//!
//! This is the main entry point for the pomo-clock application.

use std::{sync::Arc, time::Duration};

use tokio::io::BufReader;
use tracing::info;

use pomo_clock::{
    config::Config,
    services::{
        open_file_store, probe_store, Clock, SystemClock, TokioScheduler, FRAME_INTERVAL,
    },
    state::clamp_settings,
    tasks::{session_runner_task, Countdown, CountdownRegistry, PomodoroSession},
    utils::shutdown_signal,
};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomo_clock={}", config.log_level()))
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(config));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let settings = clamp_settings(&config.raw_settings());
    info!("Starting pomo-clock v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: work={}min, short={}min, long={}min, interval={}, state={}",
        settings.work_minutes,
        settings.short_break_minutes,
        settings.long_break_minutes,
        settings.long_break_interval,
        config.state_file.display()
    );

    let store = probe_store(open_file_store(&config.state_file));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (scheduler, ticks) =
        TokioScheduler::new(tokio::runtime::Handle::current(), FRAME_INTERVAL);
    let scheduler = Arc::new(scheduler);

    let registry = CountdownRegistry::new();
    let lease = registry.acquire(&config.namespace, || {
        Countdown::new(
            config.countdown_options(),
            Arc::clone(&clock),
            Arc::clone(&store),
            scheduler,
        )
        .with_on_done(|| eprint!("\x07"))
    });

    let mut session = PomodoroSession::new(settings, lease, clock, store);
    session.start();

    info!("Commands: s=start/resume  p=pause  n=skip  x=reset  h=hide  v=show  q=quit");
    let commands = BufReader::new(tokio::io::stdin());
    let session = session_runner_task(
        session,
        ticks,
        commands,
        shutdown_signal(),
        config.runner_options(),
    )
    .await;

    registry.release(session.into_lease());
    info!("Timer stopped, progress saved");
    Ok(())
}
