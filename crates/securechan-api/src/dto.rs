//! Wire DTOs for the handshake and session-frame envelopes. Every byte
//! field is base64-standard with padding; this module is the only place in
//! the crate that touches base64 codec.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use securechan_core::SecureChanError;

pub fn b64_decode(field: &str, value: &str) -> Result<Vec<u8>, SecureChanError> {
    STANDARD
        .decode(value)
        .map_err(|e| SecureChanError::BadPayload(format!("{field}: invalid base64: {e}")))
}

pub fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

// ── POST /handshake/init ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitRequestDto {
    pub rsa_pub_client: String,
    pub ecdsa_pub_client: String,
    pub nonce1: String,
    pub signature1: String,
}

#[derive(Debug, Serialize)]
pub struct InitResponseDto {
    pub client_id: String,
    pub rsa_pub_server: String,
    pub ecdsa_pub_server: String,
    pub nonce2: String,
    pub signature2: String,
}

// ── POST /handshake/finalize ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FinalizeRequestDto {
    pub encrypted: String,
    pub signature3: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponseDto {
    pub signature4: String,
}

// ── POST /session/test ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionFrameRequestDto {
    pub encrypted_message: String,
    pub client_signature: String,
}

#[derive(Debug, Serialize)]
pub struct SessionFrameResponseDto {
    pub plaintext: String,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponseDto {
    pub error: String,
}
