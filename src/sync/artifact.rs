//! Versioned artifacts and the clocks that stamp them.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::transform::RenderResult;

/// Monotonic version stamp attached to every published artifact.
///
/// Serialized as a bare JSON number (`"ts"` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    #[cfg(test)]
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[cfg(test)]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How new versions are derived from the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionClock {
    /// Wall-clock milliseconds, bumped past the previous version if needed.
    ///
    /// Survives restarts: a client holding a stamp from an earlier run still
    /// sees the next build as newer.
    #[default]
    Millis,
    /// Plain counter starting at 1.
    Sequence,
}

impl VersionClock {
    /// Stamp the version that follows `previous`.
    ///
    /// Always strictly greater than `previous`.
    pub fn next(self, previous: Option<Version>) -> Version {
        let floor = previous.map_or(1, |v| v.0.saturating_add(1));
        match self {
            Self::Sequence => Version(floor),
            Self::Millis => Version(now_millis().max(floor)),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// One published recompute result.
///
/// Shared as `Arc<Artifact>` and replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    #[serde(rename = "ts")]
    pub version: Version,
    #[serde(flatten)]
    pub payload: RenderResult,
}

impl Artifact {
    pub fn new(version: Version, payload: RenderResult) -> Self {
        Self { version, payload }
    }

    /// True if this artifact is strictly newer than what the client holds.
    ///
    /// A client holding nothing (`None`) is behind any artifact.
    pub fn is_newer_than(&self, since: Option<Version>) -> bool {
        since.is_none_or(|since| self.version > since)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Features, Node};

    fn artifact(version: u64) -> Artifact {
        Artifact::new(
            Version::new(version),
            RenderResult {
                root: Node::root(),
                features: Features::default(),
            },
        )
    }

    #[test]
    fn test_sequence_clock_starts_at_one() {
        let clock = VersionClock::Sequence;
        let first = clock.next(None);
        assert_eq!(first, Version::new(1));
        assert_eq!(clock.next(Some(first)), Version::new(2));
    }

    #[test]
    fn test_millis_clock_is_monotonic_past_future_stamps() {
        // A previous stamp far in the future must still be exceeded
        let future = Version::new(u64::MAX / 2);
        let next = VersionClock::Millis.next(Some(future));
        assert_eq!(next, Version::new(u64::MAX / 2 + 1));
    }

    #[test]
    fn test_millis_clock_tracks_wall_time() {
        let stamp = VersionClock::Millis.next(None);
        assert!(stamp.get() > 1_600_000_000_000);
    }

    #[test]
    fn test_millis_clock_strictly_increases_in_tight_loop() {
        let mut previous = None;
        for _ in 0..1000 {
            let next = VersionClock::Millis.next(previous);
            if let Some(prev) = previous {
                assert!(next > prev);
            }
            previous = Some(next);
        }
    }

    #[test]
    fn test_is_newer_than() {
        let a = artifact(5);
        assert!(a.is_newer_than(None));
        assert!(a.is_newer_than(Some(Version::new(4))));
        assert!(!a.is_newer_than(Some(Version::new(5))));
        assert!(!a.is_newer_than(Some(Version::new(6))));
    }

    #[test]
    fn test_artifact_json_shape() {
        let json = serde_json::to_value(artifact(7)).unwrap();
        assert_eq!(json["ts"], 7);
        assert_eq!(json["root"]["type"], "root");
        assert!(json["features"].is_object());
        assert!(json.get("version").is_none());
        assert!(json.get("payload").is_none());
    }
}
