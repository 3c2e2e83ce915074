//! Nonce store: a short-TTL set of seen nonces, used for both the
//! handshake-nonce namespace (`n1`/`n3`) and the session-nonce namespace
//! (frame nonces). The two namespaces are separate [`NonceStore`] instances
//! rather than one store with a prefix, so a handshake nonce and a session
//! nonce can never collide even if a client reuses the same bytes.

use std::time::Duration;

use crate::ttl_map::TtlMap;

/// `DashMap`-backed "seen within TTL" set, keyed by the raw nonce bytes.
#[derive(Clone)]
pub struct NonceStore {
    map: TtlMap<Vec<u8>, ()>,
    ttl: Duration,
}

impl NonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: TtlMap::new(),
            ttl,
        }
    }

    /// `true` iff `nonce` was previously accepted and has not yet expired.
    pub fn seen(&self, nonce: &[u8]) -> bool {
        self.map.contains(&nonce.to_vec())
    }

    /// Idempotent insert with this store's TTL.
    pub fn add(&self, nonce: &[u8]) {
        self.map.insert(nonce.to_vec(), (), self.ttl);
    }

    /// Atomic `seen`-then-`add`: returns `true` if `nonce` was fresh and is
    /// now recorded, `false` if it was already present (a replay). This is
    /// the primitive every call site in the engine uses — a separate
    /// `seen()` followed by `add()` would leave a window where two
    /// concurrent requests for the same nonce could both observe `false` from
    /// `seen` and both proceed, letting the same nonce be accepted twice.
    pub fn check_and_insert(&self, nonce: &[u8]) -> bool {
        self.map.insert_if_absent(nonce.to_vec(), (), self.ttl)
    }

    /// The TTL this store was constructed with. For the session-nonce
    /// instance this doubles as the accepted clock-skew window `W` the
    /// session frame codec checks incoming timestamps against.
    pub fn nonce_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn spawn_reaper(&self, name: &'static str, interval: Duration) -> tokio::task::JoinHandle<()> {
        crate::ttl_map::spawn_reaper(name, self.map.clone(), interval)
    }
}
