//! Single-slot artifact cache with coalesced recomputes.
//!
//! The gate is a two-state machine guarded by one mutex:
//!
//! ```text
//!            trigger                      finish (not dirty)
//!   Idle ─────────────▶ Running{dirty} ─────────────────────▶ Idle
//!                         │  ▲
//!       trigger: dirty=true│  │finish (dirty): run once more
//!                         ▼  │
//!                       Running{dirty}
//! ```
//!
//! At most one recompute runs at any instant. Triggers that land while a run
//! is in flight only set `dirty`, and each finished dirty run owes exactly
//! one follow-up.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};

use super::artifact::{Artifact, Version, VersionClock};
use super::error::RecomputeError;
use super::notifier::ChangeNotifier;
use crate::transform::Transformer;
use crate::watch::ChangeSink;
use crate::{debug, log, logger};

/// Tuning knobs for a [`VersionedCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    pub clock: VersionClock,
    /// Minimum gap between the end of one run and the start of the next.
    pub min_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { dirty: bool },
}

/// Latest artifact of one source file.
pub struct VersionedCache {
    this: Weak<Self>,
    source: PathBuf,
    transformer: Arc<dyn Transformer>,
    options: CacheOptions,
    slot: ArcSwapOption<Artifact>,
    notifier: ChangeNotifier,
    phase: Mutex<Phase>,
    /// Signalled after every finished run.
    settled: Condvar,
    last_finished: Mutex<Option<Instant>>,
    recomputes: AtomicU64,
}

impl VersionedCache {
    pub fn new(
        source: impl Into<PathBuf>,
        transformer: Arc<dyn Transformer>,
        options: CacheOptions,
    ) -> Arc<Self> {
        let source = source.into();
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            source,
            transformer,
            options,
            slot: ArcSwapOption::empty(),
            notifier: ChangeNotifier::new(),
            phase: Mutex::new(Phase::Idle),
            settled: Condvar::new(),
            last_finished: Mutex::new(None),
            recomputes: AtomicU64::new(0),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Lock-free snapshot of the published artifact.
    pub fn current(&self) -> Option<Arc<Artifact>> {
        self.slot.load_full()
    }

    /// Number of recompute attempts so far.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.load(Ordering::Relaxed)
    }

    /// Current artifact, building it synchronously on first use.
    ///
    /// Joins an in-flight run instead of starting a second one. If that run
    /// fails, builds once more on this thread so the caller sees the error.
    pub fn get(&self) -> Result<Arc<Artifact>, RecomputeError> {
        if let Some(current) = self.current() {
            return Ok(current);
        }

        {
            let mut phase = self.phase.lock();
            loop {
                if let Some(current) = self.current() {
                    return Ok(current);
                }
                if *phase == Phase::Idle {
                    *phase = Phase::Running { dirty: false };
                    break;
                }
                self.settled.wait(&mut phase);
            }
        }

        let result = self.recompute();
        if self.finish_run() {
            self.spawn_worker();
        }
        result
    }

    /// Ask for a fresh artifact. Never blocks on the recompute itself.
    ///
    /// Starts a background run when idle; otherwise marks the in-flight run
    /// dirty so it is followed by exactly one more.
    pub fn trigger_recompute(&self) {
        {
            let mut phase = self.phase.lock();
            if let Phase::Running { dirty } = &mut *phase {
                if !*dirty {
                    debug!("sync"; "recompute in flight, coalescing trigger");
                }
                *dirty = true;
                return;
            }
            *phase = Phase::Running { dirty: false };
        }
        self.spawn_worker();
    }

    /// Long-poll primitive: see [`ChangeNotifier::wait_for_newer_than`].
    pub fn wait_for_newer_than(
        &self,
        since: Option<Version>,
        timeout: Duration,
    ) -> Option<Arc<Artifact>> {
        self.notifier.wait_for_newer_than(&self.slot, since, timeout)
    }

    /// Block until no recompute is in flight. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut phase = self.phase.lock();
        while *phase != Phase::Idle {
            if self.settled.wait_until(&mut phase, deadline).timed_out() {
                return *phase == Phase::Idle;
            }
        }
        true
    }

    // =========================================================================
    // Worker
    // =========================================================================

    fn spawn_worker(&self) {
        let Some(this) = self.this.upgrade() else {
            self.abandon();
            return;
        };
        let spawned = thread::Builder::new()
            .name("recompute".into())
            .spawn(move || this.run_worker());
        if let Err(e) = spawned {
            log!("watch"; "failed to start recompute: {}", e);
            self.abandon();
        }
    }

    fn run_worker(&self) {
        loop {
            self.cooldown();
            match self.recompute() {
                Ok(artifact) => logger::status_success(&format!(
                    "rebuilt {} (v{}, {} nodes)",
                    self.source.display(),
                    artifact.version,
                    artifact.payload.root.count()
                )),
                Err(e) => logger::status_error(
                    &format!("{} failed: {}", e.label(), self.source.display()),
                    &format!("{e:#}"),
                ),
            }
            if !self.finish_run() {
                break;
            }
        }
    }

    /// Read, transform, publish, notify.
    fn recompute(&self) -> Result<Arc<Artifact>, RecomputeError> {
        self.recomputes.fetch_add(1, Ordering::Relaxed);

        let content =
            fs::read_to_string(&self.source).map_err(|source| RecomputeError::SourceRead {
                path: self.source.clone(),
                source,
            })?;
        let payload = self.transformer.transform(&content)?;

        let previous = self.current().map(|a| a.version);
        let artifact = Arc::new(Artifact::new(self.options.clock.next(previous), payload));

        // Publish before firing so late subscribers find it in the slot
        self.slot.store(Some(Arc::clone(&artifact)));
        let woken = self.notifier.fire(&artifact);
        debug!("sync"; "published v{} to {} waiter(s)", artifact.version, woken);

        Ok(artifact)
    }

    /// Close the current run. Returns `true` if a follow-up run is owed;
    /// the gate then stays `Running` for it.
    fn finish_run(&self) -> bool {
        *self.last_finished.lock() = Some(Instant::now());

        let mut phase = self.phase.lock();
        let again = *phase == Phase::Running { dirty: true };
        *phase = if again {
            Phase::Running { dirty: false }
        } else {
            Phase::Idle
        };
        self.settled.notify_all();
        again
    }

    fn abandon(&self) {
        *self.phase.lock() = Phase::Idle;
        self.settled.notify_all();
    }

    fn cooldown(&self) {
        let min = self.options.min_interval;
        if min.is_zero() {
            return;
        }
        let last = *self.last_finished.lock();
        if let Some(last) = last {
            let remaining = min.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
    }
}

impl ChangeSink for VersionedCache {
    fn on_change(&self) {
        self.trigger_recompute();
    }
}
