//! Principal extraction.
//!
//! Full bearer-token validation is out of scope for this core: it assumes an
//! opaque, already-authenticated `principal_id` is available per request and
//! ships only a placeholder extractor that reads it from a header, so the
//! HTTP surface is end-to-end runnable without a full auth stack sitting in
//! front of it.

use axum::http::HeaderMap;

use securechan_core::SecureChanError;

/// Narrow seam standing in for a real bearer-token/identity-provider
/// integration. A production deployment swaps in an implementation that
/// validates a token and extracts the subject; this core only needs the
/// resulting string.
pub trait PrincipalExtractor: Send + Sync {
    fn extract(&self, headers: &HeaderMap) -> Result<String, SecureChanError>;
}

/// Reads `X-Principal-Id` verbatim. Not a substitute for authentication —
/// every caller is trusted to have already verified the principal upstream
/// of this service.
pub struct HeaderPrincipalExtractor {
    header_name: &'static str,
}

impl Default for HeaderPrincipalExtractor {
    fn default() -> Self {
        Self {
            header_name: "x-principal-id",
        }
    }
}

impl PrincipalExtractor for HeaderPrincipalExtractor {
    fn extract(&self, headers: &HeaderMap) -> Result<String, SecureChanError> {
        headers
            .get(self.header_name)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                SecureChanError::InvalidSession("missing or empty X-Principal-Id header".into())
            })
    }
}
