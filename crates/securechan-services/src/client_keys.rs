//! Client public-key store: short-TTL `principal_id → (rsa_pub_der,
//! ecdsa_pub_der)`, written once by a successful Init and read by every
//! Finalize and session frame after it.

use std::time::Duration;

use crate::ttl_map::TtlMap;

#[derive(Clone)]
struct ClientPublicKeys {
    rsa_pub_der: Vec<u8>,
    ecdsa_pub_der: Vec<u8>,
}

/// `DashMap`-backed implementation of the client public-key store.
///
/// A successful `save` is observable by every `get` that happens-after it in
/// program order: both operations go through the same underlying map, with
/// no buffering in between.
#[derive(Clone)]
pub struct ClientKeyStore {
    map: TtlMap<String, ClientPublicKeys>,
    ttl: Duration,
}

impl ClientKeyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: TtlMap::new(),
            ttl,
        }
    }

    pub fn save(&self, principal_id: &str, rsa_pub_der: Vec<u8>, ecdsa_pub_der: Vec<u8>) {
        self.map.insert(
            principal_id.to_string(),
            ClientPublicKeys {
                rsa_pub_der,
                ecdsa_pub_der,
            },
            self.ttl,
        );
    }

    pub fn get_rsa(&self, principal_id: &str) -> Option<Vec<u8>> {
        self.map.get(&principal_id.to_string()).map(|k| k.rsa_pub_der)
    }

    pub fn get_ecdsa(&self, principal_id: &str) -> Option<Vec<u8>> {
        self.map
            .get(&principal_id.to_string())
            .map(|k| k.ecdsa_pub_der)
    }

    /// Spawn the background TTL-reaper task for this store. The returned
    /// handle runs for as long as it (or the process) lives; the daemon
    /// entry point holds one per store and never awaits it.
    pub fn spawn_reaper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        crate::ttl_map::spawn_reaper("client_keys", self.map.clone(), interval)
    }
}
