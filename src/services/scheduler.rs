//! Tick schedulers
//!
//! A scheduler only decides *when* the owning countdown should recompute. It
//! hands out a [`ScheduleHandle`] per request; when the request comes due the
//! host passes that handle back to the countdown, which ignores any handle it
//! is no longer waiting on.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use tokio::{runtime::Handle, sync::mpsc, task::AbortHandle, time::sleep};
use tracing::trace;

/// Roughly one frame at 60 Hz.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Identifies one scheduled recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(u64);

impl ScheduleHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// How a recompute was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Next display refresh; used while the page is visible.
    Fast,
    /// Fixed delay; used while the page is hidden.
    Slow(Duration),
}

pub trait Scheduler: Send + Sync {
    fn schedule_fast(&self) -> ScheduleHandle;
    fn schedule_slow(&self, interval: Duration) -> ScheduleHandle;
    fn cancel(&self, handle: ScheduleHandle);
}

/// Number of cancelled handles a [`ManualScheduler`] remembers.
const CANCELLED_HISTORY: usize = 256;

#[derive(Debug, Default)]
struct ManualQueue {
    next_id: u64,
    pending: VecDeque<(ScheduleHandle, ScheduleKind)>,
    cancelled: VecDeque<ScheduleHandle>,
}

/// Scheduler that only records requests; the caller decides when they fire.
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, kind: ScheduleKind) -> ScheduleHandle {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.next_id += 1;
        let handle = ScheduleHandle(queue.next_id);
        queue.pending.push_back((handle, kind));
        handle
    }

    /// Pop the oldest outstanding request.
    pub fn next(&self) -> Option<(ScheduleHandle, ScheduleKind)> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .pop_front()
    }

    pub fn pending(&self) -> Vec<(ScheduleHandle, ScheduleKind)> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .iter()
            .copied()
            .collect()
    }

    /// Whether `handle` was cancelled. Only the most recent cancellations are
    /// remembered.
    pub fn was_cancelled(&self, handle: ScheduleHandle) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancelled
            .contains(&handle)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_fast(&self) -> ScheduleHandle {
        self.push(ScheduleKind::Fast)
    }

    fn schedule_slow(&self, interval: Duration) -> ScheduleHandle {
        self.push(ScheduleKind::Slow(interval))
    }

    fn cancel(&self, handle: ScheduleHandle) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.pending.retain(|(pending, _)| *pending != handle);
        if queue.cancelled.len() == CANCELLED_HISTORY {
            queue.cancelled.pop_front();
        }
        queue.cancelled.push_back(handle);
    }
}

/// Scheduler backed by tokio timers. Fired handles arrive on the receiver
/// returned from [`TokioScheduler::new`].
#[derive(Debug)]
pub struct TokioScheduler {
    runtime: Handle,
    frame_interval: Duration,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<ScheduleHandle, AbortHandle>>>,
    fired_tx: mpsc::UnboundedSender<ScheduleHandle>,
}

impl TokioScheduler {
    pub fn new(
        runtime: Handle,
        frame_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ScheduleHandle>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            runtime,
            frame_interval,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            fired_tx,
        };
        (scheduler, fired_rx)
    }

    fn spawn_after(&self, delay: Duration) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tasks = Arc::clone(&self.tasks);
        let fired_tx = self.fired_tx.clone();

        // Held across spawn so the task cannot look itself up before it is registered.
        let mut registered = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let task = self.runtime.spawn(async move {
            sleep(delay).await;
            let still_pending = tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&handle)
                .is_some();
            if still_pending && fired_tx.send(handle).is_err() {
                trace!("Tick receiver dropped, discarding handle {}", handle.id());
            }
        });
        registered.insert(handle, task.abort_handle());
        handle
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_fast(&self) -> ScheduleHandle {
        self.spawn_after(self.frame_interval)
    }

    fn schedule_slow(&self, interval: Duration) -> ScheduleHandle {
        self.spawn_after(interval)
    }

    fn cancel(&self, handle: ScheduleHandle) {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}
