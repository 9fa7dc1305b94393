//! Long-poll protocol: "anything newer than T? if not, wait up to D".

use std::sync::Arc;
use std::time::Duration;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::artifact::{Artifact, Version};
use super::cache::VersionedCache;
use crate::debug;

/// Wait bounds for a poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeouts {
    /// Used when the request names no timeout.
    pub default: Duration,
    /// Upper bound for requested timeouts.
    pub max: Duration,
}

impl Default for PollTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_millis(10_000),
            max: Duration::from_millis(60_000),
        }
    }
}

impl PollTimeouts {
    /// Effective wait for a request.
    pub fn resolve(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default).min(self.max)
    }
}

/// Result of one poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Updated(Arc<Artifact>),
    /// Timed out (or shut down) with nothing newer. Serialized as `{}`.
    Unchanged,
}

impl PollOutcome {
    #[cfg(test)]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for PollOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Updated(artifact) => artifact.serialize(serializer),
            Self::Unchanged => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Long-poll endpoint over one cache.
pub struct LongPoll {
    cache: Arc<VersionedCache>,
    timeouts: PollTimeouts,
}

impl LongPoll {
    pub fn new(cache: Arc<VersionedCache>, timeouts: PollTimeouts) -> Self {
        Self { cache, timeouts }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &Arc<VersionedCache> {
        &self.cache
    }

    /// Resolve with the first artifact newer than `since`, or `Unchanged`
    /// after the (clamped) timeout.
    pub fn get_since(&self, since: Option<Version>, timeout: Option<Duration>) -> PollOutcome {
        let timeout = self.timeouts.resolve(timeout);
        debug!(
            "poll";
            "since {:?}, {} already waiting",
            since.map(|v| v.to_string()),
            self.cache.notifier().subscriber_count()
        );
        match self.cache.wait_for_newer_than(since, timeout) {
            Some(artifact) => PollOutcome::Updated(artifact),
            None => PollOutcome::Unchanged,
        }
    }

    pub fn handle(&self, query: &PollQuery) -> PollOutcome {
        self.get_since(query.since, query.timeout)
    }
}

/// Parsed `/data` query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollQuery {
    pub since: Option<Version>,
    pub timeout: Option<Duration>,
}

impl PollQuery {
    /// Parse `ts=<number>&timeout=<ms>`. Unknown keys are ignored.
    ///
    /// Malformed numbers read as absent; negatives clamp to zero and
    /// fractions truncate.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "ts" => parsed.since = parse_number(&value).map(Version::new),
                "timeout" => parsed.timeout = parse_number(&value).map(Duration::from_millis),
                _ => {}
            }
        }
        parsed
    }
}

fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let n = raw.parse::<f64>().ok().filter(|n| n.is_finite())?;
    // `as` saturates: negatives become 0, fractions truncate
    Some(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{CacheOptions, VersionClock};
    use crate::transform::MarkdownTransformer;
    use std::fs;
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    fn endpoint(content: &str, timeouts: PollTimeouts) -> (TempDir, std::path::PathBuf, LongPoll) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, content).unwrap();
        let cache = VersionedCache::new(
            &path,
            Arc::new(MarkdownTransformer),
            CacheOptions {
                clock: VersionClock::Sequence,
                ..CacheOptions::default()
            },
        );
        cache.get().unwrap();
        (dir, path, LongPoll::new(cache, timeouts))
    }

    #[test]
    fn test_parse_query() {
        let q = PollQuery::parse("ts=42&timeout=500");
        assert_eq!(q.since, Some(Version::new(42)));
        assert_eq!(q.timeout, Some(Duration::from_millis(500)));

        assert_eq!(PollQuery::parse(""), PollQuery::default());
        assert_eq!(PollQuery::parse("ts=").since, None);
        assert_eq!(PollQuery::parse("ts=abc").since, None);
        assert_eq!(PollQuery::parse("ts=NaN").since, None);
        assert_eq!(PollQuery::parse("ts=-5").since, Some(Version::ZERO));
        assert_eq!(PollQuery::parse("ts=12.9").since, Some(Version::new(12)));
        assert_eq!(PollQuery::parse("other=1&ts=3").since, Some(Version::new(3)));
    }

    #[test]
    fn test_timeouts_clamp_to_max() {
        let timeouts = PollTimeouts {
            default: Duration::from_millis(100),
            max: Duration::from_millis(200),
        };
        assert_eq!(timeouts.resolve(None), Duration::from_millis(100));
        assert_eq!(
            timeouts.resolve(Some(Duration::from_secs(60))),
            Duration::from_millis(200)
        );
        assert_eq!(timeouts.resolve(Some(Duration::ZERO)), Duration::ZERO);
    }

    #[test]
    fn test_unchanged_serializes_as_empty_object() {
        assert_eq!(PollOutcome::Unchanged.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_stale_client_gets_current_immediately() {
        let (_dir, _path, poll) = endpoint("# A", PollTimeouts::default());

        let start = Instant::now();
        let outcome = poll.get_since(Some(Version::ZERO), None);
        assert!(outcome.is_updated());
        assert!(start.elapsed() < Duration::from_secs(1));

        let outcome = poll.get_since(None, None);
        let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(json["ts"], 1);
        assert_eq!(json["root"]["children"][0]["content"], "A");
    }

    #[test]
    fn test_up_to_date_client_times_out() {
        let (_dir, _path, poll) = endpoint("# A", PollTimeouts::default());

        let timeout = Duration::from_millis(50);
        let start = Instant::now();
        let outcome = poll.get_since(Some(Version::new(1)), Some(timeout));

        assert!(!outcome.is_updated());
        assert!(start.elapsed() >= timeout);
        assert_eq!(poll.cache().notifier().subscriber_count(), 0);
    }

    #[test]
    fn test_client_receives_edit_while_polling() {
        let (_dir, path, poll) = endpoint("# A\n## B", PollTimeouts::default());
        let poll = Arc::new(poll);

        let client = {
            let poll = Arc::clone(&poll);
            thread::spawn(move || poll.handle(&PollQuery::parse("ts=1")))
        };
        while poll.cache().notifier().subscriber_count() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        fs::write(&path, "# A\n## B\n## C").unwrap();
        poll.cache().trigger_recompute();

        let PollOutcome::Updated(artifact) = client.join().unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(artifact.version, Version::new(2));
        assert_eq!(
            artifact.payload.root.children[0].child_contents(),
            vec!["B", "C"]
        );
    }
}
