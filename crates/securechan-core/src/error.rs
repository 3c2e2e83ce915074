//! Protocol error kinds shared by the handshake engine and the session codec.
//!
//! This enum is exhaustive by design: every rejection path in the engine
//! resolves to exactly one of these variants, and the transport adapter maps
//! each one to a single HTTP status code. No variant carries cryptographic
//! material or raw request bytes — only identifiers safe to log (hex nonces,
//! principal ids).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecureChanError {
    /// Structural, decoding, padding, or length violation.
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// ECDSA verification failed, or a signature did not decode as
    /// well-formed DER.
    #[error("bad signature")]
    BadSignature,

    /// Session-frame HMAC mismatch.
    #[error("bad mac")]
    BadMac,

    /// Required client-keys or session-keys entry missing or expired.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// A nonce was previously accepted.
    #[error("replay detected")]
    ReplayDetected,

    /// Frame timestamp outside the accepted clock-skew window.
    #[error("stale timestamp")]
    StaleTimestamp,

    /// Backing-store failure or RNG failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SecureChanError {
    /// Short machine-readable tag, stable across releases. Used in log
    /// fields and in the JSON `error` body at the transport boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            SecureChanError::BadPayload(_) => "bad_payload",
            SecureChanError::BadSignature => "bad_signature",
            SecureChanError::BadMac => "bad_mac",
            SecureChanError::InvalidSession(_) => "invalid_session",
            SecureChanError::ReplayDetected => "replay_detected",
            SecureChanError::StaleTimestamp => "stale_timestamp",
            SecureChanError::Internal(_) => "internal",
        }
    }
}
