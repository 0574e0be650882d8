// src/cache.rs
//! TTL cache over feed snapshots.
//!
//! One entry per feed key. A read past the expiry is a miss, but the stale
//! snapshot stays retrievable so callers can serve last-known-good data
//! while a refresh runs (stale-while-revalidate). Expiry math goes through
//! the injected [`Clock`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clock::Clock;
use crate::model::FeedSnapshot;

#[derive(Debug, Clone)]
struct Entry {
    snapshot: Arc<FeedSnapshot>,
    expires_at: u64,
}

/// Result of a cache read.
#[derive(Debug, Clone)]
pub enum CacheRead {
    /// Entry present and within TTL.
    Fresh(Arc<FeedSnapshot>),
    /// Entry present but past TTL; servable while a refresh runs.
    Stale(Arc<FeedSnapshot>),
    Miss,
}

pub struct FeedCache {
    inner: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FeedCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn get(&self, feed_key: &str) -> CacheRead {
        let map = self.inner.read().expect("feed cache lock poisoned");
        match map.get(feed_key) {
            None => CacheRead::Miss,
            Some(entry) => {
                if self.clock.now_unix() < entry.expires_at {
                    CacheRead::Fresh(Arc::clone(&entry.snapshot))
                } else {
                    CacheRead::Stale(Arc::clone(&entry.snapshot))
                }
            }
        }
    }

    /// Most recent snapshot regardless of freshness.
    pub fn last_known(&self, feed_key: &str) -> Option<Arc<FeedSnapshot>> {
        match self.get(feed_key) {
            CacheRead::Fresh(s) | CacheRead::Stale(s) => Some(s),
            CacheRead::Miss => None,
        }
    }

    /// Entries expire at `generated_at + ttl`, not at insertion time, so a
    /// snapshot's freshness window starts when it was built.
    pub fn put(&self, feed_key: &str, snapshot: Arc<FeedSnapshot>) {
        let generated = snapshot.generated_at.timestamp().max(0) as u64;
        let expires_at = generated + self.ttl.as_secs();
        let mut map = self.inner.write().expect("feed cache lock poisoned");
        map.insert(
            feed_key.to_string(),
            Entry {
                snapshot,
                expires_at,
            },
        );
    }

    pub fn invalidate(&self, feed_key: &str) {
        let mut map = self.inner.write().expect("feed cache lock poisoned");
        map.remove(feed_key);
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn snapshot(key: &str) -> Arc<FeedSnapshot> {
        Arc::new(FeedSnapshot {
            feed_key: key.to_string(),
            posts: Vec::new(),
            per_source_counts: BTreeMap::new(),
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn fresh_until_ttl_then_stale_then_invalidate() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        ));
        let cache = FeedCache::new(Duration::from_secs(3600), clock.clone());

        assert!(matches!(cache.get("community:all"), CacheRead::Miss));

        cache.put("community:all", snapshot("community:all"));
        assert!(matches!(cache.get("community:all"), CacheRead::Fresh(_)));

        clock.advance_secs(3599);
        assert!(matches!(cache.get("community:all"), CacheRead::Fresh(_)));

        // Exactly at the boundary the entry is no longer fresh.
        clock.advance_secs(1);
        assert!(matches!(cache.get("community:all"), CacheRead::Stale(_)));
        assert!(cache.last_known("community:all").is_some());

        cache.invalidate("community:all");
        assert!(matches!(cache.get("community:all"), CacheRead::Miss));
    }

    #[test]
    fn feeds_are_independent() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        ));
        let cache = FeedCache::new(Duration::from_secs(60), clock);

        cache.put("a", snapshot("a"));
        assert!(matches!(cache.get("a"), CacheRead::Fresh(_)));
        assert!(matches!(cache.get("b"), CacheRead::Miss));
    }
}
