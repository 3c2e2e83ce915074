//! Handshake engine: the three-message `init` / `finalize` state machine.
//! Both functions are pure aside from their effects on the stores passed
//! in — no internal state, no background tasks, no retries.
//!
//! Each call takes an explicit [`CancellationToken`]: since every store
//! here is in-process and non-blocking, the only place cancellation can act
//! is at entry, but the signature is kept uniform with a networked-store
//! backend in mind.

use tokio_util::sync::CancellationToken;

use securechan_core::crypto;
use securechan_core::transcript::{transcript_finalize, transcript_init, transcript_init_resp};
use securechan_core::SecureChanError;
use securechan_services::{ClientKeyStore, NonceStore, ServerKeyStore, SessionKeyStore};

/// Decoded inputs to Init. `principal_id` comes from the transport's
/// `PrincipalExtractor`, everything else from the base64 fields of the
/// request envelope.
pub struct InitRequest {
    pub principal_id: String,
    pub rsa_pub_c: Vec<u8>,
    pub ecdsa_pub_c: Vec<u8>,
    pub n1: Vec<u8>,
    pub sig1: Vec<u8>,
}

/// Decoded outputs of a successful Init, ready for base64 encoding at the
/// transport boundary.
pub struct InitResponse {
    pub rsa_pub_s: Vec<u8>,
    pub ecdsa_pub_s: Vec<u8>,
    pub n2: Vec<u8>,
    pub sig2: Vec<u8>,
}

/// Run the Init step of the handshake.
///
/// Step 1 (nonce consumption) happens before any other validation and is not
/// undone on a later failure: a rejected Init still burns `n1`.
pub fn init(
    req: &InitRequest,
    server_keys: &ServerKeyStore,
    client_keys: &ClientKeyStore,
    handshake_nonces: &NonceStore,
    cancel: &CancellationToken,
) -> Result<InitResponse, SecureChanError> {
    if cancel.is_cancelled() {
        return Err(SecureChanError::Internal("operation cancelled".into()));
    }

    // Step 1: replay check, fail-closed, burn the nonce regardless of what
    // follows.
    if !handshake_nonces.check_and_insert(&req.n1) {
        tracing::warn!(principal = %req.principal_id, nonce = hex::encode(&req.n1), "init: replayed n1");
        return Err(SecureChanError::ReplayDetected);
    }

    // Step 2: parse the client's ECDSA public key. A malformed key is a
    // structural decoding failure (BadPayload), not a signature failure.
    let ecdsa_pub_c = crypto::parse_ecdsa_public_key_der(&req.ecdsa_pub_c).map_err(|e| {
        tracing::warn!(principal = %req.principal_id, error = %e, "init: malformed ecdsa_pub_client");
        SecureChanError::BadPayload(format!("malformed ecdsa_pub_client: {e}"))
    })?;

    // Steps 3-4: verify signature1 over rsa_pub_c ‖ ecdsa_pub_c ‖ n1. A
    // malformed DER signature and a failed verification both surface as
    // BadSignature (crypto::ecdsa_verify treats them identically).
    let transcript = transcript_init(&req.rsa_pub_c, &req.ecdsa_pub_c, &req.n1);
    if !crypto::ecdsa_verify(&ecdsa_pub_c, &transcript, &req.sig1) {
        tracing::warn!(principal = %req.principal_id, "init: bad signature1");
        return Err(SecureChanError::BadSignature);
    }

    // Step 5: persist the client's keys.
    client_keys.save(&req.principal_id, req.rsa_pub_c.clone(), req.ecdsa_pub_c.clone());

    // Step 6-7: draw n2, sign the response transcript.
    let n2 = crypto::random_bytes(8);
    let rsa_pub_s = server_keys.rsa_pub_der().to_vec();
    let ecdsa_pub_s = server_keys.ecdsa_pub_der().to_vec();
    let resp_transcript =
        transcript_init_resp(&rsa_pub_s, &ecdsa_pub_s, &n2, &req.n1, &req.principal_id);
    let sig2 = crypto::ecdsa_sign(server_keys.ecdsa_priv(), &resp_transcript);

    tracing::info!(principal = %req.principal_id, "init: accepted");

    Ok(InitResponse {
        rsa_pub_s,
        ecdsa_pub_s,
        n2,
        sig2,
    })
}

/// Decoded inputs to Finalize.
pub struct FinalizeRequest {
    pub principal_id: String,
    pub sig3: Vec<u8>,
    pub encrypted_payload: Vec<u8>,
}

/// Decoded output of a successful Finalize.
pub struct FinalizeResponse {
    pub sig4: Vec<u8>,
}

/// Run the Finalize step of the handshake.
pub fn finalize(
    req: &FinalizeRequest,
    server_keys: &ServerKeyStore,
    client_keys: &ClientKeyStore,
    handshake_nonces: &NonceStore,
    session_keys: &SessionKeyStore,
    cancel: &CancellationToken,
) -> Result<FinalizeResponse, SecureChanError> {
    if cancel.is_cancelled() {
        return Err(SecureChanError::Internal("operation cancelled".into()));
    }

    // Step 1: RSA-OAEP decrypt.
    let plaintext = crypto::rsa_oaep_decrypt(server_keys.rsa_priv(), &req.encrypted_payload)
        .map_err(|e| {
            tracing::warn!(principal = %req.principal_id, error = %e, "finalize: oaep decrypt failed");
            SecureChanError::BadPayload(format!("oaep decrypt failed: {e}"))
        })?;

    // Step 2: fixed-length payload, slice into ks ‖ n3 ‖ n2_echo.
    if plaintext.len() != 48 {
        tracing::warn!(principal = %req.principal_id, len = plaintext.len(), "finalize: wrong payload length");
        return Err(SecureChanError::BadPayload(format!(
            "expected 48-byte payload, got {}",
            plaintext.len()
        )));
    }
    let ks: [u8; 32] = plaintext[0..32].try_into().expect("slice is 32 bytes");
    let n3 = &plaintext[32..40];
    let n2_echo = &plaintext[40..48];

    // Step 4: fetch the client's ECDSA key bound during Init. Missing means
    // the client must redo Init.
    let ecdsa_pub_c_der = client_keys.get_ecdsa(&req.principal_id).ok_or_else(|| {
        tracing::warn!(principal = %req.principal_id, "finalize: no client keys on file");
        SecureChanError::InvalidSession("no client keys on file, redo init".into())
    })?;
    let ecdsa_pub_c = crypto::parse_ecdsa_public_key_der(&ecdsa_pub_c_der).map_err(|e| {
        SecureChanError::Internal(format!("stored client ecdsa key is corrupt: {e}"))
    })?;

    // Step 3 + 5: verify signature3 over ks ‖ n3 ‖ n2_echo — the same bytes
    // as `plaintext`, rebuilt through the named transcript helper rather
    // than reusing the raw OAEP output, so this call site matches the one
    // sig4 is computed over below.
    let transcript = transcript_finalize(&ks, n3, n2_echo);
    if !crypto::ecdsa_verify(&ecdsa_pub_c, &transcript, &req.sig3) {
        tracing::warn!(principal = %req.principal_id, "finalize: bad signature3");
        return Err(SecureChanError::BadSignature);
    }

    // Step 6: replay check on n3, fail-closed, burn the nonce regardless of
    // what follows.
    if !handshake_nonces.check_and_insert(n3) {
        tracing::warn!(principal = %req.principal_id, nonce = hex::encode(n3), "finalize: replayed n3");
        return Err(SecureChanError::ReplayDetected);
    }

    // Step 7-8: derive and persist session keys. Last-writer-wins on a
    // concurrent second Finalize for the same principal.
    let k_enc: [u8; 32] = crypto::hmac_sha256(&ks, b"enc");
    let k_mac: [u8; 32] = crypto::hmac_sha256(&ks, b"mac");
    session_keys.put(&req.principal_id, k_enc, k_mac);

    // Step 9: sign the same transcript back as sig4.
    let sig4 = crypto::ecdsa_sign(server_keys.ecdsa_priv(), &transcript);

    tracing::info!(principal = %req.principal_id, "finalize: accepted");

    Ok(FinalizeResponse { sig4 })
}
