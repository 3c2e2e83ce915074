//! Server key store.
//!
//! Loads the server's fixed RSA and ECDSA key pairs from PEM at startup and
//! exposes them as an immutable, process-lifetime singleton. Failing fast
//! here — rather than tolerating a missing or malformed key and surfacing
//! the problem on the first handshake — is deliberate: a daemon that can't
//! prove its own identity shouldn't accept traffic at all.

use std::sync::Arc;

use p256::ecdsa::{SigningKey, VerifyingKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use securechan_core::config::IdentityConfig;
use securechan_core::crypto;
use thiserror::Error;

struct Inner {
    rsa_priv: RsaPrivateKey,
    rsa_pub: RsaPublicKey,
    rsa_pub_der: Vec<u8>,
    ecdsa_priv: SigningKey,
    ecdsa_pub: VerifyingKey,
    ecdsa_pub_der: Vec<u8>,
}

/// Immutable, shared handle to the server's key material.
#[derive(Clone)]
pub struct ServerKeyStore(Arc<Inner>);

impl ServerKeyStore {
    /// Read all four PEM files and parse them, validating key types.
    pub fn load(identity: &IdentityConfig) -> Result<Self, ServerKeyError> {
        let rsa_priv_pem = read(&identity.rsa_private_key_path)?;
        let rsa_pub_pem = read(&identity.rsa_public_key_path)?;
        let ecdsa_priv_pem = read(&identity.ecdsa_private_key_path)?;
        let ecdsa_pub_pem = read(&identity.ecdsa_public_key_path)?;

        let rsa_priv = crypto::rsa_private_key_from_pem(&rsa_priv_pem)
            .map_err(|e| ServerKeyError::Parse("RSA private key".into(), e.to_string()))?;
        let (rsa_pub, rsa_pub_der) = crypto::rsa_public_key_from_pem(&rsa_pub_pem)
            .map_err(|e| ServerKeyError::Parse("RSA public key".into(), e.to_string()))?;
        let ecdsa_priv = crypto::ecdsa_signing_key_from_pem(&ecdsa_priv_pem)
            .map_err(|e| ServerKeyError::Parse("ECDSA private key".into(), e.to_string()))?;
        let (ecdsa_pub, ecdsa_pub_der) = crypto::ecdsa_public_key_from_pem(&ecdsa_pub_pem)
            .map_err(|e| ServerKeyError::Parse("ECDSA public key".into(), e.to_string()))?;

        Ok(Self(Arc::new(Inner {
            rsa_priv,
            rsa_pub,
            rsa_pub_der,
            ecdsa_priv,
            ecdsa_pub,
            ecdsa_pub_der,
        })))
    }

    pub fn rsa_priv(&self) -> &RsaPrivateKey {
        &self.0.rsa_priv
    }

    pub fn rsa_pub(&self) -> &RsaPublicKey {
        &self.0.rsa_pub
    }

    /// The exact DER bytes embedded in handshake responses and covered by
    /// `signature2`.
    pub fn rsa_pub_der(&self) -> &[u8] {
        &self.0.rsa_pub_der
    }

    pub fn ecdsa_priv(&self) -> &SigningKey {
        &self.0.ecdsa_priv
    }

    pub fn ecdsa_pub(&self) -> &VerifyingKey {
        &self.0.ecdsa_pub
    }

    pub fn ecdsa_pub_der(&self) -> &[u8] {
        &self.0.ecdsa_pub_der
    }
}

fn read(path: &std::path::Path) -> Result<String, ServerKeyError> {
    std::fs::read_to_string(path).map_err(|e| ServerKeyError::Read(path.to_path_buf(), e))
}

#[derive(Debug, Error)]
pub enum ServerKeyError {
    #[error("failed to read {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(String, String),
}
