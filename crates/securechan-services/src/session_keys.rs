//! Session-key store: short-TTL `principal_id → (k_enc, k_mac)`, written once
//! by a successful Finalize and read by every session frame after it.
//!
//! `k_enc`/`k_mac` are secrets: the value type zeroizes its buffers on drop
//! so a sweep eviction or an overwrite by a later Finalize doesn't leave
//! stale key bytes sitting in freed heap memory.

use std::time::Duration;

use zeroize::Zeroize;

use crate::ttl_map::TtlMap;

#[derive(Clone)]
struct SessionKeyPair {
    k_enc: [u8; 32],
    k_mac: [u8; 32],
}

impl Drop for SessionKeyPair {
    fn drop(&mut self) {
        self.k_enc.zeroize();
        self.k_mac.zeroize();
    }
}

/// `DashMap`-backed implementation of the session-key store. One active pair
/// per principal; a later Finalize overwrites the earlier one (last-writer-
/// wins).
#[derive(Clone)]
pub struct SessionKeyStore {
    map: TtlMap<String, SessionKeyPair>,
    ttl: Duration,
}

impl SessionKeyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: TtlMap::new(),
            ttl,
        }
    }

    pub fn put(&self, principal_id: &str, k_enc: [u8; 32], k_mac: [u8; 32]) {
        self.map
            .insert(principal_id.to_string(), SessionKeyPair { k_enc, k_mac }, self.ttl);
    }

    pub fn get(&self, principal_id: &str) -> Option<([u8; 32], [u8; 32])> {
        self.map
            .get(&principal_id.to_string())
            .map(|pair| (pair.k_enc, pair.k_mac))
    }

    pub fn delete(&self, principal_id: &str) {
        self.map.remove(&principal_id.to_string());
    }

    pub fn spawn_reaper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        crate::ttl_map::spawn_reaper("session_keys", self.map.clone(), interval)
    }
}
