//! Session runner background task

use std::{future::Future, time::Duration};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
    time::interval,
};
use tracing::{debug, info, warn};

use super::PomodoroSession;
use crate::services::ScheduleHandle;

/// Keyboard commands accepted on the runner's command stream, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start, or resume when paused.
    Start,
    Pause,
    Skip,
    Reset,
    /// Treat the display as backgrounded.
    Hide,
    Show,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" | "resume" | "r" | "" => Some(Self::Start),
            "pause" | "p" => Some(Self::Pause),
            "skip" | "n" | "next" => Some(Self::Skip),
            "reset" | "x" => Some(Self::Reset),
            "hide" | "h" => Some(Self::Hide),
            "show" | "v" => Some(Self::Show),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Stop after this many phases finish naturally.
    pub cycles: Option<usize>,
    pub status_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            cycles: None,
            status_interval: Duration::from_secs(1),
        }
    }
}

/// Drive `session` until shutdown, a quit command, or the cycle limit.
///
/// Fired scheduler handles arrive on `ticks`; `commands` is usually stdin.
/// Returns the session so the caller can release its countdown lease.
pub async fn session_runner_task<R, F>(
    mut session: PomodoroSession,
    mut ticks: mpsc::UnboundedReceiver<ScheduleHandle>,
    commands: R,
    shutdown: F,
    options: RunnerOptions,
) -> PomodoroSession
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    info!("Starting session runner");

    tokio::pin!(shutdown);
    let mut lines = commands.lines();
    let mut commands_open = true;
    let mut status = interval(options.status_interval);
    let mut finished = 0usize;

    loop {
        tokio::select! {
            Some(handle) = ticks.recv() => {
                let Some(record) = session.handle_tick(handle) else {
                    continue;
                };
                finished += 1;
                if options.cycles.is_some_and(|limit| finished >= limit) {
                    info!("Completed {} phases, stopping", finished);
                    break;
                }
                if !session.lease().lock().is_running() {
                    info!(
                        "{} finished, {} is ready (enter 's' to start)",
                        record.phase,
                        session.machine().phase
                    );
                }
            }

            _ = status.tick() => {
                let countdown = session.countdown();
                if countdown.is_running {
                    info!(
                        "{} {} ({:.0}%), round {}, {} today",
                        session.machine().phase,
                        countdown.formatted(),
                        countdown.progress * 100.0,
                        session.machine().round_number(),
                        session.rounds_completed_today()
                    );
                }
            }

            line = lines.next_line(), if commands_open => {
                match line {
                    Ok(Some(line)) => match Command::parse(&line) {
                        Some(Command::Quit) => {
                            info!("Quit requested");
                            break;
                        }
                        Some(command) => apply_command(&mut session, command),
                        None => warn!("Unknown command: {:?}", line.trim()),
                    },
                    Ok(None) => {
                        debug!("Command stream closed");
                        commands_open = false;
                    }
                    Err(e) => {
                        warn!("Failed to read command: {}", e);
                        commands_open = false;
                    }
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    session
}

fn apply_command(session: &mut PomodoroSession, command: Command) {
    debug!("Applying command {:?}", command);
    match command {
        Command::Start => session.start(),
        Command::Pause => session.pause(),
        Command::Skip => {
            session.skip();
        }
        Command::Reset => session.reset(),
        Command::Hide => {
            session.set_visible(false);
        }
        Command::Show => {
            if let Some(record) = session.set_visible(true) {
                info!("{} finished while hidden", record.phase);
            }
        }
        Command::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{ManualClock, MemoryStore, TokioScheduler},
        state::{Phase, TimerSettings},
        tasks::{Countdown, CountdownOptions, CountdownRegistry, SessionOutcome},
    };
    use std::sync::Arc;
    use tokio::{runtime::Handle, time::timeout};

    const T0: i64 = 1_760_000_000_000;

    fn settings() -> TimerSettings {
        TimerSettings {
            work_minutes: 1,
            auto_start_breaks: false,
            ..TimerSettings::default()
        }
    }

    fn session_with_tokio(
        clock: &ManualClock,
        registry: &CountdownRegistry,
    ) -> (PomodoroSession, mpsc::UnboundedReceiver<ScheduleHandle>) {
        let (scheduler, ticks) = TokioScheduler::new(Handle::current(), Duration::from_millis(2));
        let store = MemoryStore::new();
        let scheduler = Arc::new(scheduler);
        let lease = registry.acquire("runner", || {
            Countdown::new(
                CountdownOptions::new("runner"),
                Arc::new(clock.clone()),
                Arc::new(store.clone()),
                scheduler,
            )
        });
        let session = PomodoroSession::new(
            settings(),
            lease,
            Arc::new(clock.clone()),
            Arc::new(store),
        );
        (session, ticks)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("p"), Some(Command::Pause));
        assert_eq!(Command::parse("  Skip "), Some(Command::Skip));
        assert_eq!(Command::parse(""), Some(Command::Start));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("dance"), None);
    }

    #[tokio::test]
    async fn stops_after_cycle_limit() {
        let clock = ManualClock::new(T0);
        let registry = CountdownRegistry::new();
        let (mut session, ticks) = session_with_tokio(&clock, &registry);

        session.start();
        clock.advance(60_000);

        let options = RunnerOptions {
            cycles: Some(1),
            status_interval: Duration::from_millis(50),
        };
        let session = timeout(
            Duration::from_secs(5),
            session_runner_task(session, ticks, &b""[..], std::future::pending(), options),
        )
        .await
        .expect("runner finished");

        assert_eq!(session.machine().phase, Phase::ShortBreak);
        assert_eq!(session.history().count(), 1);
        assert!(registry.release(session.into_lease()));
    }

    #[tokio::test]
    async fn applies_commands_until_quit() {
        let clock = ManualClock::new(T0);
        let registry = CountdownRegistry::new();
        let (session, ticks) = session_with_tokio(&clock, &registry);

        let session = timeout(
            Duration::from_secs(5),
            session_runner_task(
                session,
                ticks,
                &b"s\nhide\nn\nq\n"[..],
                std::future::pending(),
                RunnerOptions::default(),
            ),
        )
        .await
        .expect("runner finished");

        let history: Vec<_> = session.history().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, SessionOutcome::Skipped);
        assert_eq!(session.machine().phase, Phase::ShortBreak);
        assert!(!session.lease().lock().is_visible());
    }

    #[tokio::test]
    async fn shutdown_future_stops_runner() {
        let clock = ManualClock::new(T0);
        let registry = CountdownRegistry::new();
        let (session, ticks) = session_with_tokio(&clock, &registry);

        let session = timeout(
            Duration::from_secs(5),
            session_runner_task(
                session,
                ticks,
                &b""[..],
                tokio::time::sleep(Duration::from_millis(20)),
                RunnerOptions::default(),
            ),
        )
        .await
        .expect("runner finished");

        assert_eq!(session.machine().phase, Phase::Work);
    }
}
