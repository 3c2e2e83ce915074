//! A `DashMap`-backed map where every entry carries its own expiry instant,
//! plus a background sweep that matches `summitd`'s capability-registry
//! reaper: wake up on an interval, `retain` everything still live, log how
//! many entries were dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A TTL-tracked map keyed by `K`, shared via `Arc` across the stores that
/// wrap it and the reaper task that sweeps it.
pub struct TtlMap<K, V> {
    inner: Arc<DashMap<K, Entry<V>>>,
}

impl<K, V> Clone for TtlMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for TtlMap<K, V>
where
    K: Eq + std::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + std::hash::Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Insert or overwrite, expiring `ttl` from now.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        self.inner.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Insert only if absent (and not expired). Returns `true` if the value
    /// was inserted, `false` if an unexpired entry already existed.
    ///
    /// This is the building block for the nonce store's `seen`+`add`
    /// atomicity requirement: callers that need "accept at most once" call
    /// this instead of a separate `contains`-then-`insert` pair.
    pub fn insert_if_absent(&self, key: K, value: V, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.inner.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                if occ.get().expires_at <= now {
                    occ.insert(Entry {
                        value,
                        expires_at: now + ttl,
                    });
                    true
                } else {
                    false
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vac) => {
                vac.insert(Entry {
                    value,
                    expires_at: now + ttl,
                });
                true
            }
        }
    }

    /// `true` if `key` maps to an unexpired entry.
    pub fn contains(&self, key: &K) -> bool {
        match self.inner.get(key) {
            Some(entry) => entry.expires_at > Instant::now(),
            None => false,
        }
    }

    /// Current value for `key`, if present and unexpired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub fn remove(&self, key: &K) {
        self.inner.remove(key);
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Spawn a background task that sweeps `map` on `interval`, logging the
/// removed count. Mirrors `summitd`'s `expiry_loop` shape, generalized to
/// any `TtlMap`. The returned handle is not awaited by callers that intend
/// the reaper to run for the process lifetime; drop it to cancel.
pub fn spawn_reaper<K, V>(
    name: &'static str,
    map: TtlMap<K, V>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = map.sweep();
            if removed > 0 {
                tracing::debug!(store = name, removed, "expired stale entries");
            }
        }
    })
}
