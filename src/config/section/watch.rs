//! `[watch]` section configuration.
//!
//! ```toml
//! [watch]
//! min_interval = 0      # Minimum gap between rebuilds (ms, 0 = none)
//! clock = "millis"      # Version stamps: "millis" or "sequence"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::{CacheOptions, VersionClock};

/// Rebuild settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub min_interval: u64,
    pub clock: VersionClock,
}

impl WatchConfig {
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            clock: self.clock,
            min_interval: Duration::from_millis(self.min_interval),
        }
    }
}
