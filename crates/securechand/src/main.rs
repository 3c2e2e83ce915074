//! securechand — secure-channel handshake and session-frame daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use securechan_api::{ApiState, HeaderPrincipalExtractor};
use securechan_core::config::SecureChanConfig;
use securechan_services::{ClientKeyStore, NonceStore, ServerKeyStore, SessionKeyStore};

/// How often each store's TTL reaper sweeps for expired entries. Independent
/// of any store's own TTL: a short interval here just means expired entries
/// are freed sooner, not that anything expires sooner.
const REAPER_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SecureChanConfig::load().context("failed to load configuration")?;
    tracing::info!(listen_addr = %config.network.listen_addr, "securechand starting");

    let server_keys = ServerKeyStore::load(&config.identity)
        .context("failed to load server key material")?;

    let client_keys = ClientKeyStore::new(config.ttl.client_pubkey_ttl);
    let handshake_nonces = NonceStore::new(config.ttl.handshake_nonce_ttl);
    let session_nonces = NonceStore::new(config.ttl.session_nonce_ttl);
    let session_keys = SessionKeyStore::new(config.ttl.session_key_ttl);

    // One reaper per TTL store; each runs for the process lifetime.
    let _client_keys_reaper = client_keys.spawn_reaper(REAPER_INTERVAL);
    let _handshake_nonces_reaper = handshake_nonces.spawn_reaper("handshake_nonces", REAPER_INTERVAL);
    let _session_nonces_reaper = session_nonces.spawn_reaper("session_nonces", REAPER_INTERVAL);
    let _session_keys_reaper = session_keys.spawn_reaper(REAPER_INTERVAL);

    let state = ApiState {
        server_keys,
        client_keys,
        handshake_nonces,
        session_nonces,
        session_keys,
        principal_extractor: Arc::new(HeaderPrincipalExtractor::default()),
    };

    securechan_api::serve(state, &config.network.listen_addr)
        .await
        .context("API server exited")?;

    Ok(())
}
