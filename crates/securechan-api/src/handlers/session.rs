//! `/session/test` handler.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tokio_util::sync::CancellationToken;

use securechan_engine as engine;

use super::{error_response, ApiState};
use crate::dto::{b64_decode, ErrorResponseDto, SessionFrameRequestDto, SessionFrameResponseDto};
use securechan_core::SecureChanError;

pub async fn handle_session_test(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<SessionFrameRequestDto>,
) -> Result<Json<SessionFrameResponseDto>, (StatusCode, Json<ErrorResponseDto>)> {
    let principal_id = state
        .principal_extractor
        .extract(&headers)
        .map_err(error_response)?;

    let frame = b64_decode("encrypted_message", &req.encrypted_message).map_err(error_response)?;
    let outer_sig = b64_decode("client_signature", &req.client_signature).map_err(error_response)?;

    let cancel = CancellationToken::new();
    let plaintext = engine::parse_frame(
        &principal_id,
        &outer_sig,
        &frame,
        &state.client_keys,
        &state.session_keys,
        &state.session_nonces,
        &cancel,
    )
    .map_err(error_response)?;

    let plaintext = String::from_utf8(plaintext).map_err(|_| {
        error_response(SecureChanError::BadPayload(
            "decrypted frame is not valid UTF-8".into(),
        ))
    })?;

    Ok(Json(SessionFrameResponseDto { plaintext }))
}
