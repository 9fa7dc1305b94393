//! Broadcast change notification with timed waiters.
//!
//! Every waiter owns a one-shot channel registered under an id. `fire`
//! drains the whole registry, so one recompute resolves every pending waiter.
//! The check-then-register step and `fire` share the registry lock, which
//! closes the gap between "the update already happened" and "subscribe me".

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::artifact::{Artifact, Version};

type Waiter = Sender<Arc<Artifact>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    waiters: FxHashMap<u64, Waiter>,
}

/// Fan-out signal fired once per completed recompute.
#[derive(Default)]
pub struct ChangeNotifier {
    registry: Mutex<Registry>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `slot` holds something newer than `since`, or `timeout` elapses.
    ///
    /// Resolves immediately when the slot is already ahead of the caller.
    /// Returns `None` on timeout or when the notifier is closed.
    pub fn wait_for_newer_than(
        &self,
        slot: &ArcSwapOption<Artifact>,
        since: Option<Version>,
        timeout: Duration,
    ) -> Option<Arc<Artifact>> {
        let (tx, rx) = channel::bounded(1);

        let id = {
            let mut registry = self.registry.lock();
            if let Some(current) = slot.load_full()
                && current.is_newer_than(since)
            {
                return Some(current);
            }
            let id = registry.next_id;
            registry.next_id += 1;
            registry.waiters.insert(id, tx);
            id
        };

        match rx.recv_timeout(timeout) {
            Ok(artifact) => Some(artifact),
            Err(RecvTimeoutError::Disconnected) => None,
            Err(RecvTimeoutError::Timeout) => self.settle_timed_out(id, &rx),
        }
    }

    /// Deregister waiter `id` after its timeout.
    ///
    /// If `fire` or `close` already took the sender, the outcome is whatever
    /// they do with it next: a delivered artifact or a disconnect.
    fn settle_timed_out(&self, id: u64, rx: &Receiver<Arc<Artifact>>) -> Option<Arc<Artifact>> {
        if self.registry.lock().waiters.remove(&id).is_some() {
            return None;
        }
        rx.recv().ok()
    }

    /// Deliver `artifact` to every registered waiter.
    ///
    /// Callers publish to the slot first, then fire.
    pub fn fire(&self, artifact: &Arc<Artifact>) -> usize {
        let waiters = std::mem::take(&mut self.registry.lock().waiters);
        let count = waiters.len();
        for tx in waiters.into_values() {
            let _ = tx.send(Arc::clone(artifact));
        }
        count
    }

    /// Release every waiter without a value (shutdown).
    pub fn close(&self) -> usize {
        let waiters = std::mem::take(&mut self.registry.lock().waiters);
        waiters.len()
    }

    /// Number of currently registered waiters.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().waiters.len()
    }
}
