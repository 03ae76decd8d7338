//! TTL Cache
//!
//! Generic time-to-live key/value cache over DashMap. Used for postal
//! lookups (30-day TTL) and nearest-result memoization (1-hour TTL).

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval for the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared-state TTL cache.
///
/// Expired entries are purged lazily on read (an entry is never returned
/// after its expiry, and never resurrected) and in bulk by the periodic
/// sweep. Reads and the sweep use the same DashMap shard locking, so the
/// sweep never blocks `get`/`set` longer than a shard scan.
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Get a live value. Expired entries are forgotten on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            if Instant::now() <= entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        // Guard dropped above; remove only if still expired.
        self.entries
            .remove_if(key, |_, e| Instant::now() > e.expires_at);
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Whether a live (non-expired) entry exists.
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| Instant::now() <= e.expires_at)
            .unwrap_or(false)
    }

    /// Entry count, including not-yet-purged expired entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| now > e.value().expires_at)
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            if self
                .entries
                .remove_if(&key, |_, e| now > e.expires_at)
                .is_some()
            {
                removed += 1;
            }
        }
        removed
    }

    /// Start the periodic sweep that bounds memory held by dead entries.
    pub fn start_sweep(&self, interval: Duration) {
        let cache = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "cache sweep completed");
                }
            }
        });
    }
}
