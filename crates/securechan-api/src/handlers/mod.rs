//! HTTP handlers — maps the handshake and session-frame JSON envelopes
//! onto `securechan-engine` calls, performing base64 codec and principal
//! extraction at the boundary only.

pub mod handshake;
pub mod session;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;

use securechan_core::SecureChanError;
use securechan_services::{ClientKeyStore, NonceStore, ServerKeyStore, SessionKeyStore};

use crate::dto::ErrorResponseDto;
use crate::principal::PrincipalExtractor;

/// Shared handles every handler reads from. Cheap to clone (every field is
/// itself an `Arc`-backed handle or a clone of one).
#[derive(Clone)]
pub struct ApiState {
    pub server_keys: ServerKeyStore,
    pub client_keys: ClientKeyStore,
    pub handshake_nonces: NonceStore,
    pub session_nonces: NonceStore,
    pub session_keys: SessionKeyStore,
    pub principal_extractor: Arc<dyn PrincipalExtractor>,
}

/// Maps a protocol error onto its HTTP status code and a JSON
/// `{ "error": ... }` body. No cryptographic material ever reaches here —
/// `SecureChanError`'s `Display` impl is already scrubbed (see
/// `securechan_core::error`).
pub fn error_response(err: SecureChanError) -> (StatusCode, Json<ErrorResponseDto>) {
    let status = match &err {
        SecureChanError::BadPayload(_) | SecureChanError::StaleTimestamp => StatusCode::BAD_REQUEST,
        SecureChanError::BadSignature | SecureChanError::BadMac | SecureChanError::InvalidSession(_) => {
            StatusCode::UNAUTHORIZED
        }
        SecureChanError::ReplayDetected => StatusCode::CONFLICT,
        SecureChanError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(kind = err.kind(), status = status.as_u16(), "request rejected");
    (status, Json(ErrorResponseDto { error: err.to_string() }))
}

pub use handshake::{handle_finalize, handle_init};
pub use session::handle_session_test;
