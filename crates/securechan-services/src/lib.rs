//! Short-lived stores the handshake and session-frame codec depend on:
//! server key material, client public keys, handshake/session nonces, and
//! session keys. Every store here is an in-process `DashMap` with TTL
//! eviction (`ttl_map`); swapping in a networked KV store later is a
//! drop-in behind the same method signatures.

pub mod client_keys;
pub mod nonce_store;
pub mod server_keys;
pub mod session_keys;
pub mod ttl_map;

pub use client_keys::ClientKeyStore;
pub use nonce_store::NonceStore;
pub use server_keys::{ServerKeyError, ServerKeyStore};
pub use session_keys::SessionKeyStore;
pub use ttl_map::TtlMap;
