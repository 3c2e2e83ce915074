//! Cryptographic primitives wrapper.
//!
//! This is the only module in the crate that touches raw key-material APIs
//! (`rsa`, `p256`, `sha2`, `hmac`, `aes`, `cbc`, `subtle`, `rand`). Every
//! other module — stores, the handshake engine, the frame codec — calls
//! through here rather than reaching for those crates directly.
//!
//! Fixed algorithm suite, no negotiation: ECDSA-P256/SHA-256 for signatures,
//! RSA-OAEP/SHA-256 for the Finalize payload, AES-256-CBC + HMAC-SHA-256 for
//! session frames.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::DecodeEcPrivateKey;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey as RsaDecodePrivateKey, DecodePublicKey as RsaDecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

const AES_BLOCK: usize = 16;

// ── ECDSA-P256 ────────────────────────────────────────────────────────────────

/// Sign `msg` with ECDSA-P256 over SHA-256(msg), returning the signature as
/// ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }` with minimal-length
/// integers.
pub fn ecdsa_sign(signing_key: &SigningKey, msg: &[u8]) -> Vec<u8> {
    let sig: Signature = Signer::sign(signing_key, msg);
    sig.to_der().as_bytes().to_vec()
}

/// Verify an ECDSA-P256/SHA-256 signature. Strict: a signature that does not
/// decode to a well-formed DER sequence of two positive integers below the
/// curve order is rejected the same as a signature that fails verification.
pub fn ecdsa_verify(verifying_key: &VerifyingKey, msg: &[u8], der_sig: &[u8]) -> bool {
    match Signature::from_der(der_sig) {
        Ok(sig) => Verifier::verify(verifying_key, msg, &sig).is_ok(),
        Err(_) => false,
    }
}

/// Parse a SubjectPublicKeyInfo DER encoding of a P-256 public key.
pub fn parse_ecdsa_public_key_der(der: &[u8]) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::from_public_key_der(der)
        .map_err(|e| CryptoError::KeyFormat(format!("ECDSA public key: {e}")))
}

// ── RSA-OAEP ──────────────────────────────────────────────────────────────────

/// RSA-OAEP(SHA-256, empty label) encrypt.
pub fn rsa_oaep_encrypt(pub_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha256>();
    pub_key
        .encrypt(&mut rand::rngs::OsRng, padding, plaintext)
        .map_err(|e| CryptoError::RsaFailure(e.to_string()))
}

/// RSA-OAEP(SHA-256, empty label) decrypt.
pub fn rsa_oaep_decrypt(priv_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha256>();
    priv_key
        .decrypt(padding, ciphertext)
        .map_err(|e| CryptoError::RsaFailure(e.to_string()))
}

/// Parse a SubjectPublicKeyInfo DER encoding of an RSA public key, also
/// validating the modulus is at least 2048 bits wide per the entity
/// invariant on `ClientPublicKeys`.
pub fn parse_rsa_public_key_der(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let key = RsaPublicKey::from_public_key_der(der)
        .map_err(|e| CryptoError::KeyFormat(format!("RSA public key: {e}")))?;
    if rsa::traits::PublicKeyParts::n(&key).bits() < 2048 {
        return Err(CryptoError::KeyFormat(
            "RSA public key smaller than 2048 bits".into(),
        ));
    }
    Ok(key)
}

// ── AES-256-CBC ───────────────────────────────────────────────────────────────

/// PKCS#7-pad `plaintext` and encrypt with AES-256-CBC.
pub fn aes256_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt AES-256-CBC ciphertext, returning the still-padded plaintext.
/// Padding removal is a separate, constant-time step: [`pkcs7_unpad`].
pub fn aes256_cbc_decrypt(key: &[u8; 32], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK != 0 {
        return Err(CryptoError::BadLength);
    }
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| CryptoError::BadLength)
}

/// Validate and strip PKCS#7 padding from `padded`.
///
/// The pad byte `p` must lie in `[1, 16]` and the trailing `p` bytes must
/// all equal `p`. Every byte of the final block is inspected regardless of
/// the claimed pad length so that the number of comparisons performed does
/// not depend on whether the padding turns out to be valid — only the
/// eventual accept/reject decision branches on the input.
pub fn pkcs7_unpad(padded: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if padded.is_empty() || padded.len() % AES_BLOCK != 0 {
        return Err(CryptoError::BadPadding);
    }
    let len = padded.len();
    let pad_len = padded[len - 1];

    let len_in_range = subtle::Choice::from(((pad_len >= 1) && (pad_len as usize <= AES_BLOCK)) as u8);
    let mut bytes_ok = subtle::Choice::from(1u8);
    for i in 0..AES_BLOCK {
        let byte = padded[len - 1 - i];
        let within_claimed_pad = subtle::Choice::from(((i as u8) < pad_len) as u8);
        let matches = byte.ct_eq(&pad_len);
        bytes_ok &= !within_claimed_pad | matches;
    }
    let good = len_in_range & bytes_ok;

    if bool::from(good) {
        Ok(padded[..len - pad_len as usize].to_vec())
    } else {
        Err(CryptoError::BadPadding)
    }
}

// ── HMAC-SHA-256 ──────────────────────────────────────────────────────────────

/// `HMAC-SHA256(key, msg)`, 32 bytes.
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

// ── Constant-time compare ────────────────────────────────────────────────────

/// Constant-time byte equality. Both slices are expected to be the same,
/// known, fixed length in every call site in this crate (32-byte tags and
/// digests); the length check itself is not secret-dependent.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

// ── CSPRNG ────────────────────────────────────────────────────────────────────

/// `n` cryptographically random bytes. An OS RNG failure is treated as fatal
/// to the calling operation; this matches `rand::rngs::OsRng`'s own panic
/// behavior on catastrophic entropy-source failure.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

// ── PEM loading for server key material ──────────────────────────────────────

/// Decode the base64 body of a PEM block directly, without round-tripping
/// through a typed key object. Used so that the public-key bytes embedded in
/// handshake responses (and covered by signatures) are byte-for-byte the DER
/// the key file actually contains, not a re-serialization of it.
fn pem_body_to_der(pem: &str) -> Result<Vec<u8>, CryptoError> {
    use base64::Engine;
    let mut b64 = String::new();
    let mut saw_body = false;
    for line in pem.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("-----") {
            continue;
        }
        saw_body = true;
        b64.push_str(line);
    }
    if !saw_body {
        return Err(CryptoError::KeyFormat("empty PEM body".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(b64.as_bytes())
        .map_err(|e| CryptoError::KeyFormat(format!("malformed PEM base64 body: {e}")))
}

/// Load an RSA private key from PEM, accepting either PKCS#1 or PKCS#8.
pub fn rsa_private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| CryptoError::KeyFormat(format!("RSA private key: {e}")))
}

/// Load an RSA public key from PEM and return both the parsed key (for
/// validation) and the exact DER bytes embedded in the PEM, which is what
/// gets embedded byte-for-byte in handshake responses.
pub fn rsa_public_key_from_pem(pem: &str) -> Result<(RsaPublicKey, Vec<u8>), CryptoError> {
    let der = pem_body_to_der(pem)?;
    let key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::KeyFormat(format!("RSA public key: {e}")))?;
    Ok((key, der))
}

/// Load an ECDSA-P256 private key from PEM, accepting either SEC1 or PKCS#8.
pub fn ecdsa_signing_key_from_pem(pem: &str) -> Result<SigningKey, CryptoError> {
    if let Ok(key) = SigningKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    p256::SecretKey::from_sec1_pem(pem)
        .map(SigningKey::from)
        .map_err(|e| CryptoError::KeyFormat(format!("ECDSA private key: {e}")))
}

/// Load an ECDSA-P256 public key from PEM and return both the parsed key and
/// the exact DER bytes embedded in the PEM (see [`rsa_public_key_from_pem`]).
pub fn ecdsa_public_key_from_pem(pem: &str) -> Result<(VerifyingKey, Vec<u8>), CryptoError> {
    let der = pem_body_to_der(pem)?;
    let key = parse_ecdsa_public_key_der(&der)?;
    Ok((key, der))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed or unsupported key encoding: {0}")]
    KeyFormat(String),
    #[error("RSA operation failed: {0}")]
    RsaFailure(String),
    #[error("ciphertext length is not a positive multiple of the block size")]
    BadLength,
    #[error("invalid PKCS#7 padding")]
    BadPadding,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
