//! Domain-separated byte-sequence builders.
//!
//! Every signed or HMAC'd quantity in the protocol is the concatenation of a
//! handful of already self-describing values (DER-encoded keys with their
//! own length prefixes, fixed-width nonces, a length-prefix-free UTF-8
//! identity string). Because the concatenation order matters and is easy to
//! get subtly wrong at a second call site, each one is built by exactly one
//! function here rather than assembled ad hoc at the call site.

/// `rsa_pub_c ‖ ecdsa_pub_c ‖ n1` — signed by the client as `signature1`.
pub fn transcript_init(rsa_pub_c: &[u8], ecdsa_pub_c: &[u8], n1: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rsa_pub_c.len() + ecdsa_pub_c.len() + n1.len());
    out.extend_from_slice(rsa_pub_c);
    out.extend_from_slice(ecdsa_pub_c);
    out.extend_from_slice(n1);
    out
}

/// `rsa_pub_s ‖ ecdsa_pub_s ‖ n2 ‖ n1 ‖ principal_id_utf8` — signed by the
/// server as `signature2`.
pub fn transcript_init_resp(
    rsa_pub_s: &[u8],
    ecdsa_pub_s: &[u8],
    n2: &[u8],
    n1: &[u8],
    principal_id: &str,
) -> Vec<u8> {
    let principal_bytes = principal_id.as_bytes();
    let mut out = Vec::with_capacity(
        rsa_pub_s.len() + ecdsa_pub_s.len() + n2.len() + n1.len() + principal_bytes.len(),
    );
    out.extend_from_slice(rsa_pub_s);
    out.extend_from_slice(ecdsa_pub_s);
    out.extend_from_slice(n2);
    out.extend_from_slice(n1);
    out.extend_from_slice(principal_bytes);
    out
}

/// `ks ‖ n3 ‖ n2_echo` — this is both the 48-byte RSA-OAEP plaintext of
/// Finalize (so it is what `signature3` is verified over) and the message
/// `signature4` is computed over.
pub fn transcript_finalize(ks: &[u8], n3: &[u8], n2_echo: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ks.len() + n3.len() + n2_echo.len());
    out.extend_from_slice(ks);
    out.extend_from_slice(n3);
    out.extend_from_slice(n2_echo);
    out
}

/// `ts(8, big-endian) ‖ nonce(16) ‖ iv(16) ‖ ct ‖ tag(32)` — the session
/// frame itself, which doubles as the message the outer `client_signature`
/// is computed over.
pub fn transcript_frame(ts_ms: u64, nonce: &[u8], iv: &[u8], ct: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + nonce.len() + iv.len() + ct.len() + tag.len());
    out.extend_from_slice(&ts_ms.to_be_bytes());
    out.extend_from_slice(nonce);
    out.extend_from_slice(iv);
    out.extend_from_slice(ct);
    out.extend_from_slice(tag);
    out
}
