//! `/handshake/init`, `/handshake/finalize` handlers.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tokio_util::sync::CancellationToken;

use securechan_engine as engine;

use super::{error_response, ApiState};
use crate::dto::{
    b64_decode, b64_encode, ErrorResponseDto, FinalizeRequestDto, FinalizeResponseDto,
    InitRequestDto, InitResponseDto,
};

pub async fn handle_init(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<InitRequestDto>,
) -> Result<Json<InitResponseDto>, (StatusCode, Json<ErrorResponseDto>)> {
    let principal_id = state
        .principal_extractor
        .extract(&headers)
        .map_err(error_response)?;

    let rsa_pub_c = b64_decode("rsa_pub_client", &req.rsa_pub_client).map_err(error_response)?;
    let ecdsa_pub_c =
        b64_decode("ecdsa_pub_client", &req.ecdsa_pub_client).map_err(error_response)?;
    let n1 = b64_decode("nonce1", &req.nonce1).map_err(error_response)?;
    let sig1 = b64_decode("signature1", &req.signature1).map_err(error_response)?;

    let engine_req = engine::InitRequest {
        principal_id: principal_id.clone(),
        rsa_pub_c,
        ecdsa_pub_c,
        n1,
        sig1,
    };
    let cancel = CancellationToken::new();
    let resp = engine::init(
        &engine_req,
        &state.server_keys,
        &state.client_keys,
        &state.handshake_nonces,
        &cancel,
    )
    .map_err(error_response)?;

    Ok(Json(InitResponseDto {
        client_id: principal_id,
        rsa_pub_server: b64_encode(&resp.rsa_pub_s),
        ecdsa_pub_server: b64_encode(&resp.ecdsa_pub_s),
        nonce2: b64_encode(&resp.n2),
        signature2: b64_encode(&resp.sig2),
    }))
}

pub async fn handle_finalize(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<FinalizeRequestDto>,
) -> Result<Json<FinalizeResponseDto>, (StatusCode, Json<ErrorResponseDto>)> {
    let principal_id = state
        .principal_extractor
        .extract(&headers)
        .map_err(error_response)?;

    let encrypted_payload = b64_decode("encrypted", &req.encrypted).map_err(error_response)?;
    let sig3 = b64_decode("signature3", &req.signature3).map_err(error_response)?;

    let engine_req = engine::FinalizeRequest {
        principal_id,
        sig3,
        encrypted_payload,
    };
    let cancel = CancellationToken::new();
    let resp = engine::finalize(
        &engine_req,
        &state.server_keys,
        &state.client_keys,
        &state.handshake_nonces,
        &state.session_keys,
        &cancel,
    )
    .map_err(error_response)?;

    Ok(Json(FinalizeResponseDto {
        signature4: b64_encode(&resp.sig4),
    }))
}
