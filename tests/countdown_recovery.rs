use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use pomo_clock::{
    services::{Clock, FileStore, KeyValueStore, ManualClock, ManualScheduler, SystemClock},
    state::{Phase, TimerSettings},
    tasks::{Countdown, CountdownOptions, CountdownRegistry, PomodoroSession},
};

fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
    let fired = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&fired);
    (fired, move || {
        sink.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn reload_resumes_future_target_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let now = SystemClock.now_ms();

    {
        let store = FileStore::open(&path).expect("open");
        store.set("focus", &(now + 10_000).to_string()).expect("set");
        store.set("focus:duration", "25000").expect("set");
    }

    let (fired, sink) = counter();
    let countdown = Countdown::new(
        CountdownOptions::new("focus"),
        Arc::new(SystemClock),
        Arc::new(FileStore::open(&path).expect("reopen")),
        Arc::new(ManualScheduler::new()),
    )
    .with_on_done(sink);

    assert!(countdown.is_running());
    assert!(countdown.remaining_ms().abs_diff(10_000) <= 50);
    assert_eq!(countdown.duration_ms(), 25_000);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn reload_after_deadline_is_idle_and_silent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let now = SystemClock.now_ms();

    {
        let store = FileStore::open(&path).expect("open");
        store.set("focus", &(now - 30_000).to_string()).expect("set");
        store.set("focus:duration", "25000").expect("set");
    }

    let (fired, sink) = counter();
    let store = Arc::new(FileStore::open(&path).expect("reopen"));
    let countdown = Countdown::new(
        CountdownOptions::new("focus"),
        Arc::new(SystemClock),
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        Arc::new(ManualScheduler::new()),
    )
    .with_on_done(sink);

    assert!(!countdown.is_running());
    assert_eq!(countdown.remaining_ms(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(store.get("focus").expect("get"), None);
    assert_eq!(store.get("focus:duration").expect("get"), None);
}

#[test]
fn session_picks_up_where_the_previous_process_stopped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let clock = ManualClock::new(1_760_000_000_000);
    let settings = TimerSettings {
        auto_start_breaks: true,
        ..TimerSettings::default()
    };

    let open_session = |registry: &CountdownRegistry, scheduler: &ManualScheduler| {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).expect("open"));
        let lease = registry.acquire("pomo", || {
            Countdown::new(
                CountdownOptions::new("pomo"),
                Arc::new(clock.clone()),
                Arc::clone(&store),
                Arc::new(scheduler.clone()),
            )
        });
        PomodoroSession::new(settings, lease, Arc::new(clock.clone()), store)
    };

    // First process: finish one focus phase, get two minutes into the break.
    {
        let registry = CountdownRegistry::new();
        let scheduler = ManualScheduler::new();
        let mut session = open_session(&registry, &scheduler);
        session.start();

        clock.advance(25 * 60 * 1000);
        let (handle, _) = scheduler.next().expect("scheduled tick");
        let record = session.handle_tick(handle).expect("focus finished");
        assert_eq!(record.phase, Phase::Work);
        assert_eq!(session.machine().phase, Phase::ShortBreak);

        clock.advance(2 * 60 * 1000);
        registry.release(session.into_lease());
    }

    // Second process, same state file.
    let registry = CountdownRegistry::new();
    let scheduler = ManualScheduler::new();
    let session = open_session(&registry, &scheduler);

    assert_eq!(session.machine().phase, Phase::ShortBreak);
    assert_eq!(session.machine().completed_work_sessions, 1);
    assert_eq!(session.machine().sequence, 2);
    let countdown = session.countdown();
    assert!(countdown.is_running);
    assert_eq!(countdown.remaining_ms, 3 * 60 * 1000);
    assert_eq!(countdown.formatted(), "03:00");
}
