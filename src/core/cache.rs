//! Small bounded caches used by the scheduler and the expression engine

use std::hash::Hash;
use std::time::{Duration, Instant};

use ahash::AHashMap;

/// Cache whose entries expire a fixed time after insertion
///
/// Time is always passed in, so expiry is checked lazily against the
/// caller's clock and never needs a timer.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: AHashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh value for `key`, if one was inserted less than `ttl` ago
    pub fn get(&self, key: &K, now: Instant, ttl: Duration) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(inserted, _)| now.saturating_duration_since(*inserted) < ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, (now, value));
    }

    /// Return the cached value or compute, store and return a new one
    pub fn get_or_insert_with<F>(&mut self, key: &K, now: Instant, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key, now, ttl) {
            return value;
        }
        let value = compute();
        self.insert(key.clone(), value.clone(), now);
        value
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry older than `ttl`
    pub fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        self.entries
            .retain(|_, (inserted, _)| now.saturating_duration_since(*inserted) < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
struct HeatEntry<V> {
    value: V,
    heat: u64,
}

/// Bounded cache evicting the least frequently read entry
///
/// Every successful lookup raises the entry's heat by one. When a new key
/// arrives at capacity, the coldest entry is dropped. Fresh entries start
/// at zero heat, so a burst of one-off keys keeps replacing each other
/// instead of displacing hot ones.
#[derive(Debug, Clone)]
pub struct HeatCache<K, V> {
    capacity: usize,
    entries: AHashMap<K, HeatEntry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> HeatCache<K, V> {
    /// Create a cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: AHashMap::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.entries.get_mut(key).map(|entry| {
            entry.heat = entry.heat.saturating_add(1);
            entry.value.clone()
        })
    }

    pub fn insert(&mut self, key: K, value: V) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_coldest();
        }
        self.entries.insert(key, HeatEntry { value, heat: 0 });
    }

    pub fn get_or_insert_with<F>(&mut self, key: &K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.insert(key.clone(), value.clone());
        value
    }

    fn evict_coldest(&mut self) {
        let coldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.heat)
            .map(|(key, _)| key.clone());

        if let Some(key) = coldest {
            self.entries.remove(&key);
        }
    }

    pub fn heat(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.heat)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_cache_expires() {
        let start = Instant::now();
        let ttl = Duration::from_secs(5);
        let mut cache = TtlCache::new();
        cache.insert("door", true, start);

        assert_eq!(cache.get(&"door", start + Duration::from_secs(4), ttl), Some(true));
        assert_eq!(cache.get(&"door", start + Duration::from_secs(5), ttl), None);
    }

    #[test]
    fn test_ttl_cache_computes_once_within_window() {
        let start = Instant::now();
        let ttl = Duration::from_secs(5);
        let mut cache = TtlCache::new();
        let mut calls = 0;

        for offset in 0..3 {
            let now = start + Duration::from_secs(offset);
            let value = cache.get_or_insert_with(&1u64, now, ttl, || {
                calls += 1;
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(calls, 1);

        cache.get_or_insert_with(&1u64, start + Duration::from_secs(6), ttl, || {
            calls += 1;
            7
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_ttl_cache_purge() {
        let start = Instant::now();
        let ttl = Duration::from_secs(1);
        let mut cache = TtlCache::new();
        cache.insert(1, "a", start);
        cache.insert(2, "b", start + Duration::from_secs(2));

        cache.purge_expired(start + Duration::from_millis(2500), ttl);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_heat_cache_evicts_coldest() {
        let mut cache = HeatCache::new(2);
        cache.insert("hot", 1);
        cache.insert("cold", 2);

        cache.get(&"hot");
        cache.get(&"hot");
        cache.get(&"cold");

        cache.insert("new", 3);
        assert!(cache.contains(&"hot"));
        assert!(!cache.contains(&"cold"));
        assert!(cache.contains(&"new"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_heat_cache_tracks_heat() {
        let mut cache = HeatCache::new(4);
        cache.insert("a", true);
        assert_eq!(cache.heat(&"a"), Some(0));
        cache.get(&"a");
        assert_eq!(cache.heat(&"a"), Some(1));
        assert_eq!(cache.get(&"missing"), None);
    }

    #[test]
    fn test_heat_cache_zero_capacity_clamped() {
        let mut cache = HeatCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
    }
}
