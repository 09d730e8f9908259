//! Shared countdown instances
//!
//! Several observers (the session, a status reporter, ...) may watch the same
//! countdown, but only one instance per namespace may own scheduled work. The
//! registry builds the countdown on first acquire and tears it down on the
//! last release.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, info};

use super::Countdown;

/// One counted reference to a registered countdown. Return it with
/// [`CountdownRegistry::release`].
#[derive(Debug)]
pub struct CountdownLease {
    namespace: String,
    countdown: Arc<Mutex<Countdown>>,
}

impl CountdownLease {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Lock the shared countdown for one step.
    pub fn lock(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct Entry {
    countdown: Arc<Mutex<Countdown>>,
    refs: usize,
}

#[derive(Debug, Default)]
pub struct CountdownRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a reference to the countdown for `namespace`, building it with
    /// `build` if no lease is currently outstanding.
    pub fn acquire<F>(&self, namespace: &str, build: F) -> CountdownLease
    where
        F: FnOnce() -> Countdown,
    {
        let mut entries = self.entries();
        let entry = entries.entry(namespace.to_string()).or_insert_with(|| {
            info!("Creating countdown '{}'", namespace);
            Entry {
                countdown: Arc::new(Mutex::new(build())),
                refs: 0,
            }
        });
        entry.refs += 1;
        debug!("Countdown '{}' acquired ({} refs)", namespace, entry.refs);

        CountdownLease {
            namespace: namespace.to_string(),
            countdown: Arc::clone(&entry.countdown),
        }
    }

    /// Drop a reference. Returns `true` when this was the last one and the
    /// countdown was torn down.
    pub fn release(&self, lease: CountdownLease) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&lease.namespace) else {
            return false;
        };

        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            debug!("Countdown '{}' released ({} refs)", lease.namespace, entry.refs);
            return false;
        }

        if let Some(entry) = entries.remove(&lease.namespace) {
            entry
                .countdown
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .teardown();
        }
        info!("Countdown '{}' released by last owner", lease.namespace);
        true
    }

    pub fn ref_count(&self, namespace: &str) -> usize {
        self.entries().get(namespace).map(|e| e.refs).unwrap_or(0)
    }

    pub fn active_count(&self) -> usize {
        self.entries().len()
    }
}
