//! Source file watcher.
//!
//! Thin adapter over `notify`: every raw event that names the source file is
//! forwarded to a [`ChangeSink`] as-is. Coalescing lives in the sink
//! ([`crate::sync::VersionedCache`]), so no debounce window is added here.
//!
//! ```text
//! notify callback ──▶ channel ──▶ forwarding thread ──▶ sink.on_change()
//! ```
//!
//! The parent directory is watched instead of the file itself: editors that
//! save through rename-over replace the inode, which would silently detach a
//! file-level watch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::utils::path::normalize_path;
use crate::{debug, log};

/// Receiver of "the source may have changed" signals.
pub trait ChangeSink: Send + Sync + 'static {
    /// Must not block; called on the forwarding thread.
    fn on_change(&self);
}

enum Message {
    Event(notify::Result<notify::Event>),
    Stop,
}

struct Running {
    /// Dropped first on stop so no new events arrive
    watcher: Option<RecommendedWatcher>,
    tx: Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

/// Watches one file for changes.
pub struct SourceWatcher {
    path: PathBuf,
    running: Option<Running>,
}

impl SourceWatcher {
    /// Idle watcher; no OS handles until [`start`](Self::start).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            running: None,
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Begin forwarding change events to `sink`.
    ///
    /// A second call while running keeps the existing sink.
    pub fn start(&mut self, sink: Arc<dyn ChangeSink>) -> notify::Result<()> {
        if self.running.is_some() {
            debug!("watch"; "already watching {}", self.path.display());
            return Ok(());
        }

        let dir = watch_dir(&self.path);
        let (tx, rx) = channel::unbounded();

        let events_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = events_tx.send(Message::Event(res));
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let target = self.path.clone();
        let thread = thread::Builder::new()
            .name("watch".into())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Event(Ok(event)) => {
                            if is_relevant(&event, &target) {
                                debug!("watch"; "{:?} {}", event.kind, target.display());
                                sink.on_change();
                            }
                        }
                        Message::Event(Err(e)) => log!("watch"; "notify error: {}", e),
                        Message::Stop => break,
                    }
                }
            })
            .map_err(notify::Error::io)?;

        debug!("watch"; "watching {} in {}", self.path.display(), dir.display());
        self.running = Some(Running {
            watcher: Some(watcher),
            tx,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Stop watching. Idempotent; a no-op when never started.
    ///
    /// Once this returns, the sink receives no further calls.
    pub fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        drop(running.watcher.take());
        let _ = running.tx.send(Message::Stop);
        if let Some(thread) = running.thread.take()
            && thread.join().is_err()
        {
            log!("watch"; "forwarding thread panicked");
        }
        debug!("watch"; "stopped watching {}", self.path.display());
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Directory to register with the OS watcher.
fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` can have changed the content of `target`.
///
/// Access events are dropped: reading the source during a recompute must
/// not trigger another one. Metadata-only modifications are dropped too.
fn is_relevant(event: &notify::Event, target: &Path) -> bool {
    match event.kind {
        EventKind::Access(_) => return false,
        EventKind::Modify(ModifyKind::Metadata(_)) => return false,
        _ => {}
    }
    event
        .paths
        .iter()
        .any(|p| p == target || normalize_path(p) == target)
}
