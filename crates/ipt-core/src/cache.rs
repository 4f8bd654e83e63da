use std::{collections::HashMap, future::Future, hash::Hash, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{clock::Clock, Result};

/// TTL cache keyed by `K` with an injected clock.
///
/// Entries are never served once older than the TTL passed to the lookup; writers
/// invalidate explicitly. Failed computations are not cached.
pub struct FreshnessCache<K, V> {
    clock: Arc<dyn Clock>,
    entries: HashMap<K, (DateTime<Utc>, V)>,
}

impl<K: Eq + Hash + Clone, V: Clone> FreshnessCache<K, V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let (stored_at, value) = self.entries.get(key)?;
        let age = (self.clock.now() - *stored_at).to_std().unwrap_or_default();
        (age < ttl).then(|| value.clone())
    }

    pub async fn get_or_compute<F, Fut>(&mut self, key: K, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.get(&key, ttl) {
            return Ok(hit);
        }

        let value = compute().await?;
        self.entries
            .insert(key, (self.clock.now(), value.clone()));
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, Error};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ))
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn serves_cached_value_until_ttl_expires() {
        let clock = clock();
        let mut cache: FreshnessCache<&str, u32> = FreshnessCache::new(clock.clone());

        let v = cache.get_or_compute("k", TTL, || async { Ok(1) }).await.unwrap();
        assert_eq!(v, 1);

        clock.advance(chrono::Duration::seconds(59));
        let v = cache.get_or_compute("k", TTL, || async { Ok(2) }).await.unwrap();
        assert_eq!(v, 1);

        clock.advance(chrono::Duration::seconds(1));
        let v = cache.get_or_compute("k", TTL, || async { Ok(3) }).await.unwrap();
        assert_eq!(v, 3);
    }

    #[tokio::test]
    async fn invalidation_forces_recompute() {
        let mut cache: FreshnessCache<&str, u32> = FreshnessCache::new(clock());
        cache.get_or_compute("a", TTL, || async { Ok(1) }).await.unwrap();
        cache.get_or_compute("b", TTL, || async { Ok(1) }).await.unwrap();

        cache.invalidate(&"a");
        assert_eq!(cache.get(&"a", TTL), None);
        assert_eq!(cache.get(&"b", TTL), Some(1));

        cache.clear();
        assert_eq!(cache.get(&"b", TTL), None);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let mut cache: FreshnessCache<&str, u32> = FreshnessCache::new(clock());
        let err = cache
            .get_or_compute("k", TTL, || async { Err(Error::Store("down".into())) })
            .await;
        assert!(err.is_err());
        let v = cache.get_or_compute("k", TTL, || async { Ok(5) }).await.unwrap();
        assert_eq!(v, 5);
    }
}
