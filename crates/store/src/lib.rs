//! In-memory TTL caches.
//!
//! One generic expiring map backs two very different consumers: the model
//! gateway's response cache (a cost optimization whose absence must never
//! change behavior) and the voice agent's session store (where expiry is the
//! cleanup path for abandoned calls).

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A concurrency-safe map whose entries expire after a fixed TTL.
///
/// Expired entries are dropped lazily on access and eagerly by [`sweep`].
/// Two concurrent writers for the same key simply race on last-write-wins;
/// the map itself stays consistent.
///
/// [`sweep`]: TtlCache::sweep
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry. Expired entries read as absent.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Insert or replace an entry, restarting its TTL.
    pub async fn insert(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Remove an entry, returning its value if it was still live.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let entry = self.entries.write().await.remove(key)?;
        (entry.expires_at > Instant::now()).then_some(entry.value)
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.get(key).await.is_some()
    }

    /// Number of entries, live or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evict expired entries, returning how many were dropped.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let dropped = before - entries.len();
        if dropped > 0 {
            trace!(dropped, remaining = entries.len(), "TTL sweep evicted entries");
        }
        dropped
    }
}

/// Stable content-hash key over an operation name and its argument tuple.
///
/// SHA-256 rather than the stdlib hasher so keys are deterministic across
/// processes and argument boundaries cannot collide by concatenation.
pub fn cache_key(op: &str, parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(op.as_bytes());
    for part in parts {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
