//! Time-bounded memoization for the fetch layer.
//!
//! Every remote operation is keyed by its full argument tuple; a hit inside
//! the expiry window returns the stored value without touching the network,
//! a miss (or an expired entry) recomputes and overwrites.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// An in-memory memoization table with a fixed time-to-live per entry.
///
/// The mutex only guards map access; callers never hold it across a fetch,
/// so concurrent misses for the same key may both compute and the later
/// insert simply overwrites.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stored value when present and still fresh. Expired
    /// entries are dropped on the way out.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a value, overwriting any previous entry for the key.
    pub async fn insert(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().await.insert(key, entry);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_within_ttl() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 7).await;
        assert_eq!(cache.get(&"k").await, Some(7));
        assert_eq!(cache.get(&"k").await, Some(7));
    }

    #[tokio::test]
    async fn miss_after_expiry() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("k", 7).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get(&"k").await, None);
        // The expired entry is removed, not just hidden.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn insert_overwrites() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 1).await;
        cache.insert("k", 2).await;
        assert_eq!(cache.get(&"k").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn keys_are_full_argument_tuples() {
        let cache: TtlCache<(String, usize), u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert(("brisbane".to_string(), 10), 1).await;
        assert_eq!(cache.get(&("brisbane".to_string(), 5)).await, None);
        assert_eq!(cache.get(&("brisbane".to_string(), 10)).await, Some(1));
    }
}
