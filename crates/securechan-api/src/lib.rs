//! Transport adapter: maps the handshake and session-frame JSON envelope
//! onto `securechan-engine` calls over HTTP, via `axum`. No protocol logic
//! lives here — only request parsing, principal extraction, base64 codec,
//! and HTTP-status mapping.

pub mod dto;
pub mod handlers;
pub mod principal;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;
pub use principal::{HeaderPrincipalExtractor, PrincipalExtractor};

/// A session frame's ciphertext can legitimately carry large uploads; the
/// transport is expected to cap it well before handing bytes to the codec.
const SESSION_FRAME_BODY_LIMIT: usize = 5 * 1024 * 1024 * 1024;

/// Assemble the full router: `/handshake/init`, `/handshake/finalize`,
/// `/session/test`, with a permissive CORS layer matching the corpus's
/// HTTP-service convention.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/handshake/init", post(handlers::handle_init))
        .route("/handshake/finalize", post(handlers::handle_finalize))
        .route(
            "/session/test",
            post(handlers::handle_session_test).layer(DefaultBodyLimit::max(SESSION_FRAME_BODY_LIMIT)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bind and serve `router(state)` on `listen_addr` until the process is
/// killed. The daemon entry point owns TTL-reaper tasks and tracing init;
/// this function only owns the HTTP listener.
pub async fn serve(state: ApiState, listen_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = listen_addr, "securechan API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
