//! Named, bounded, sliding-TTL key/value caches behind an injectable
//! registry. Backs the regex layer's compiled-pattern and match-result
//! memoization; any other component may request its own instance.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct CacheEntry<V> {
    value: V,
    /// Milliseconds since the epoch of the last read or write. Staleness is
    /// measured from here, not from insertion.
    last_accessed: i64,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_stale(&self, now: i64) -> bool {
        let age = now.saturating_sub(self.last_accessed);
        u128::try_from(age).is_ok_and(|age| age > self.ttl.as_millis())
    }
}

/// A bounded key/value store with sliding TTL expiration and
/// least-recently-accessed eviction.
pub struct Cache<K, V> {
    name: String,
    max_size: usize,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Cache<K, V> {
    #[must_use]
    pub fn new(name: impl Into<String>, max_size: usize) -> Self {
        Self {
            name: name.into(),
            max_size: max_size.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Sliding-TTL read: a stale entry is purged and reported as a miss; a
    /// live entry has its `last_accessed` refreshed.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = now_ms();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get_mut(key) {
            Some(entry) if entry.is_stale(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => {
                entry.last_accessed = now;
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let now = now_ms();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            // O(n) scan for the globally oldest entry. Sizes are bounded, so
            // this stays cheap; a linked-list LRU would be a drop-in swap
            // with identical observable behavior.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                debug!(cache = %self.name, "evicted least recently accessed entry");
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                last_accessed: now,
                ttl,
            },
        );
    }

    /// Memoization helper: cached value if live, else compute, store and
    /// return.
    pub fn wrap(&self, key: K, ttl: Duration, f: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = f();
        self.set(key, value.clone(), ttl);
        value
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }
}

/// Explicit registry of named cache instances. Constructed by the host and
/// passed to components that need caching, so parallel tests get isolated
/// instances instead of sharing process-wide statics.
#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl CacheRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Named singleton lookup; the first call for a name wins on sizing.
    ///
    /// A name reused with different key/value types gets a fresh,
    /// unregistered cache rather than a panic, since cache names come from
    /// configuration.
    pub fn instance<K, V>(&self, name: &str, max_size: usize) -> Arc<Cache<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.lock().expect("registry mutex poisoned");
        if let Some(existing) = caches.get(name) {
            if let Ok(cache) = Arc::clone(existing).downcast::<Cache<K, V>>() {
                return cache;
            }
            warn!(name, "cache name reused with a different type; not sharing");
            return Arc::new(Cache::new(name, max_size));
        }
        let cache = Arc::new(Cache::<K, V>::new(name, max_size));
        caches.insert(name.to_string(), Arc::clone(&cache) as Arc<dyn Any + Send + Sync>);
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_set_then_get() {
        let cache: Cache<String, i32> = Cache::new("t", 10);
        cache.set("a".to_string(), 1, Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn test_entry_expires_without_access() {
        let cache: Cache<String, i32> = Cache::new("t", 10);
        cache.set("a".to_string(), 1, Duration::from_millis(30));
        sleep(Duration::from_millis(60));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_access_slides_expiration() {
        let cache: Cache<String, i32> = Cache::new("t", 10);
        cache.set("a".to_string(), 1, Duration::from_millis(80));
        sleep(Duration::from_millis(50));
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        sleep(Duration::from_millis(50));
        // 100ms since insertion, but only 50ms since last access.
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn test_eviction_removes_least_recently_accessed() {
        let cache: Cache<String, i32> = Cache::new("t", 2);
        cache.set("a".to_string(), 1, Duration::from_secs(60));
        sleep(Duration::from_millis(5));
        cache.set("b".to_string(), 2, Duration::from_secs(60));
        sleep(Duration::from_millis(5));
        // Touch "a" so "b" becomes the oldest.
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        sleep(Duration::from_millis(5));
        cache.set("c".to_string(), 3, Duration::from_secs(60));
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_wrap_computes_once() {
        let cache: Cache<String, i32> = Cache::new("t", 10);
        let mut calls = 0;
        let v = cache.wrap("k".to_string(), Duration::from_secs(60), || {
            calls += 1;
            7
        });
        assert_eq!(v, 7);
        let v2 = cache.wrap("k".to_string(), Duration::from_secs(60), || {
            calls += 1;
            8
        });
        assert_eq!(v2, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_registry_first_call_wins_on_sizing() {
        let registry = CacheRegistry::new();
        let a = registry.instance::<String, i32>("shared", 5);
        let b = registry.instance::<String, i32>("shared", 500);
        assert_eq!(b.max_size(), 5);
        a.set("x".to_string(), 1, Duration::from_secs(60));
        assert_eq!(b.get(&"x".to_string()), Some(1));
    }

    #[test]
    fn test_registry_isolated_by_name() {
        let registry = CacheRegistry::new();
        let a = registry.instance::<String, i32>("one", 5);
        let b = registry.instance::<String, i32>("two", 5);
        a.set("x".to_string(), 1, Duration::from_secs(60));
        assert_eq!(b.get(&"x".to_string()), None);
    }
}
