//! Synchronization engine.
//!
//! A [`VersionedCache`] owns the latest [`Artifact`] of one source file and
//! recomputes it on demand. Each successful recompute bumps the [`Version`],
//! publishes the artifact and fires the change notifier, which resolves
//! every pending [`LongPoll`] request at once.
//!
//! ```text
//! watcher ──▶ trigger_recompute ──▶ Transformer ──▶ slot.store ──▶ fire
//!                                                                  │
//!                                 LongPoll::get_since ◀────────────┘
//! ```

mod artifact;
mod cache;
mod error;
mod notifier;
mod poll;

pub use artifact::{Artifact, Version, VersionClock};
pub use cache::{CacheOptions, VersionedCache};
pub use poll::{LongPoll, PollQuery, PollTimeouts};

#[cfg(test)]
pub use poll::PollOutcome;
