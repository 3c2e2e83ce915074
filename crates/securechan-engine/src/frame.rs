//! Session frame codec: builds and parses the authenticated frames carried
//! by `/session/test` traffic once a handshake has produced
//! `(k_enc, k_mac)`.
//!
//! `build` is what a client SDK calls before POSTing; `parse` is what the
//! server calls on receipt. Both live in the same module because they share
//! the frame layout and the `transcript_frame` byte sequence that is also
//! what the outer client signature is computed over.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use p256::ecdsa::SigningKey;
use securechan_core::crypto;
use securechan_core::transcript::transcript_frame;
use securechan_core::SecureChanError;
use securechan_services::{ClientKeyStore, NonceStore, SessionKeyStore};

const TS_LEN: usize = 8;
const NONCE_LEN: usize = 16;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
/// `ts ‖ nonce ‖ iv ‖ tag`, i.e. the frame length minus the ciphertext.
const FIXED_LEN: usize = TS_LEN + NONCE_LEN + IV_LEN + TAG_LEN;
const MIN_FRAME_LEN: usize = FIXED_LEN + 16; // one cipher block minimum

/// Output of [`build`]: the frame bytes and the outer ECDSA signature over
/// them, ready to go on the wire as `encrypted_message`/`client_signature`.
pub struct BuiltFrame {
    pub frame: Vec<u8>,
    pub outer_sig: Vec<u8>,
}

/// Build a session frame carrying `plaintext`.
pub fn build(plaintext: &[u8], k_enc: &[u8; 32], k_mac: &[u8; 32], signing_key: &SigningKey) -> BuiltFrame {
    let ts_ms = now_ms();
    let nonce = crypto::random_bytes(NONCE_LEN);
    let iv_vec = crypto::random_bytes(IV_LEN);
    let iv: [u8; 16] = iv_vec.try_into().expect("random_bytes(16) is 16 bytes");

    let ct = crypto::aes256_cbc_encrypt(k_enc, &iv, plaintext);
    let tag = crypto::hmac_sha256(k_mac, &[iv.as_slice(), ct.as_slice()].concat());

    let frame = transcript_frame(ts_ms, &nonce, &iv, &ct, &tag);
    let outer_sig = crypto::ecdsa_sign(signing_key, &frame);

    BuiltFrame { frame, outer_sig }
}

/// Parse and authenticate a session frame. Returns the decrypted plaintext
/// on success.
///
/// Step ordering matters: the outer signature and the HMAC tag are checked
/// before anything content-dependent is parsed, and the session nonce is
/// consumed only after every cryptographic check has passed — an attacker who
/// cannot forge a valid signature or MAC can never burn a legitimate nonce.
pub fn parse(
    principal_id: &str,
    outer_sig: &[u8],
    frame: &[u8],
    client_keys: &ClientKeyStore,
    session_keys: &SessionKeyStore,
    session_nonces: &NonceStore,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, SecureChanError> {
    if cancel.is_cancelled() {
        return Err(SecureChanError::Internal("operation cancelled".into()));
    }

    // Step 1: verify the outer signature against the client's bound ECDSA
    // key. A missing client key at this point means the principal never
    // completed a handshake at all.
    let ecdsa_pub_c_der = client_keys.get_ecdsa(principal_id).ok_or_else(|| {
        SecureChanError::InvalidSession("no client keys on file, redo handshake".into())
    })?;
    let ecdsa_pub_c = crypto::parse_ecdsa_public_key_der(&ecdsa_pub_c_der)
        .map_err(|e| SecureChanError::Internal(format!("stored client ecdsa key is corrupt: {e}")))?;
    if !crypto::ecdsa_verify(&ecdsa_pub_c, frame, outer_sig) {
        tracing::warn!(principal = principal_id, "frame: bad outer signature");
        return Err(SecureChanError::BadSignature);
    }

    // Step 2: structural length check.
    if frame.len() < MIN_FRAME_LEN || (frame.len() - FIXED_LEN) % 16 != 0 {
        tracing::warn!(principal = principal_id, len = frame.len(), "frame: bad length");
        return Err(SecureChanError::BadPayload(format!(
            "frame length {} is not a valid ts‖nonce‖iv‖ct‖tag layout",
            frame.len()
        )));
    }

    // Step 3: slice.
    let ts_bytes: [u8; 8] = frame[0..8].try_into().unwrap();
    let ts_ms = u64::from_be_bytes(ts_bytes);
    let nonce = &frame[8..8 + NONCE_LEN];
    let iv_slice = &frame[8 + NONCE_LEN..8 + NONCE_LEN + IV_LEN];
    let iv: [u8; 16] = iv_slice.try_into().unwrap();
    let ct = &frame[8 + NONCE_LEN + IV_LEN..frame.len() - TAG_LEN];
    let tag = &frame[frame.len() - TAG_LEN..];

    // Step 4: fetch session keys.
    let (k_enc, k_mac) = session_keys
        .get(principal_id)
        .ok_or_else(|| SecureChanError::InvalidSession("no session keys on file, redo handshake".into()))?;

    // Step 5: HMAC.
    let expected_tag = crypto::hmac_sha256(&k_mac, &[iv.as_slice(), ct].concat());
    if !crypto::constant_time_eq(&expected_tag, tag) {
        tracing::warn!(principal = principal_id, "frame: bad mac");
        return Err(SecureChanError::BadMac);
    }

    // Step 6: decrypt and unpad.
    let padded = crypto::aes256_cbc_decrypt(&k_enc, &iv, ct)
        .map_err(|e| SecureChanError::BadPayload(format!("cbc decrypt failed: {e}")))?;
    let plaintext = crypto::pkcs7_unpad(&padded)
        .map_err(|e| SecureChanError::BadPayload(format!("padding invalid: {e}")))?;

    // Step 7: clock-skew check, window W = session nonce TTL.
    let now = now_ms();
    let skew = now.abs_diff(ts_ms);
    let window_ms = session_nonces.nonce_ttl().as_millis() as u64;
    if skew > window_ms {
        tracing::warn!(principal = principal_id, skew_ms = skew, window_ms, "frame: stale timestamp");
        return Err(SecureChanError::StaleTimestamp);
    }

    // Step 8: replay check, only now that every crypto check has passed.
    if !session_nonces.check_and_insert(nonce) {
        tracing::warn!(principal = principal_id, nonce = hex::encode(nonce), "frame: replayed nonce");
        return Err(SecureChanError::ReplayDetected);
    }

    tracing::info!(principal = principal_id, "frame: accepted");

    Ok(plaintext)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_millis() as u64
}
