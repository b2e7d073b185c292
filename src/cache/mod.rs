//! Response cache: a bounded LRU map whose entries expire after a fixed TTL.
//!
//! Expiry is checked lazily on read; nothing runs in the background.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Counters shown on the settings screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub ttl: Duration,
}

impl CacheStats {
    /// Hit ratio in percent, `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 * 100.0 / total as f64)
        }
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    map: LruCache<String, Entry<V>>,
    ttl: Duration,
    hits: u64,
    misses: u64,
    evictions: u64,
    expired: u64,
}

impl<V: Clone> TtlCache<V> {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: LruCache::new(cap),
            ttl,
            hits: 0,
            misses: 0,
            evictions: 0,
            expired: 0,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let fresh = match self.map.get(key) {
            Some(e) => now.saturating_duration_since(e.stored_at) < self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if !fresh {
            self.map.pop(key);
            self.expired += 1;
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.map.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, Instant::now());
    }

    fn insert_at(&mut self, key: String, value: V, now: Instant) {
        let entry = Entry {
            value,
            stored_at: now,
        };
        if let Some((old_key, _)) = self.map.push(key.clone(), entry)
            && old_key != key
        {
            self.evictions += 1;
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.map.len(),
            capacity: self.map.cap().get(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expired: self.expired,
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_a_hit() {
        let mut cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), Some(50.0));
    }

    #[test]
    fn expired_entry_is_dropped_on_read() {
        let mut cache = TtlCache::new(4, Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("a".into(), 1, t0);

        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(10)), None);
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn least_recently_used_is_evicted_at_capacity() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overwrite_refreshes_without_counting_eviction() {
        let mut cache = TtlCache::new(2, Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("a".into(), 1, t0);
        cache.insert_at("a".into(), 2, t0 + Duration::from_secs(8));

        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(12)), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let mut cache = TtlCache::new(0, Duration::from_secs(10));
        cache.insert("a", 1);
        assert_eq!(cache.stats().capacity, 1);
        assert_eq!(cache.get("a"), Some(1));
    }
}
