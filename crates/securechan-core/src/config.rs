//! Configuration system for securechand.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SECURECHAN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/securechan/config.toml
//!   3. ~/.config/securechan/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecureChanConfig {
    pub identity: IdentityConfig,
    pub ttl: TtlConfig,
    pub network: NetworkConfig,
}

/// Paths to the server's fixed RSA and ECDSA key pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub rsa_private_key_path: PathBuf,
    pub rsa_public_key_path: PathBuf,
    pub ecdsa_private_key_path: PathBuf,
    pub ecdsa_public_key_path: PathBuf,
}

/// TTLs for every short-lived store. `session_nonce_ttl` doubles as the
/// accepted clock-skew window for session frames. Each is stored in the
/// config file as whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    #[serde(with = "duration_secs")]
    pub handshake_nonce_ttl: Duration,
    #[serde(with = "duration_secs")]
    pub session_nonce_ttl: Duration,
    #[serde(with = "duration_secs")]
    pub session_key_ttl: Duration,
    #[serde(with = "duration_secs")]
    pub client_pubkey_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_addr: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SecureChanConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            ttl: TtlConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let dir = config_dir();
        Self {
            rsa_private_key_path: dir.join("rsa_private.pem"),
            rsa_public_key_path: dir.join("rsa_public.pem"),
            ecdsa_private_key_path: dir.join("ecdsa_private.pem"),
            ecdsa_public_key_path: dir.join("ecdsa_public.pem"),
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            handshake_nonce_ttl: Duration::from_secs(5 * 60),
            session_nonce_ttl: Duration::from_secs(30),
            session_key_ttl: Duration::from_secs(60 * 60),
            client_pubkey_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8443".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("securechan")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SecureChanConfig {
    /// Load config: file → env var overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            SecureChanConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SECURECHAN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply `SECURECHAN_*` env var overrides, the final word over both the
    /// config file and the built-in defaults.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SECURECHAN_NETWORK__LISTEN_ADDR") {
            self.network.listen_addr = v;
        }
        if let Ok(v) = std::env::var("SECURECHAN_IDENTITY__RSA_PRIVATE_KEY_PATH") {
            self.identity.rsa_private_key_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SECURECHAN_IDENTITY__RSA_PUBLIC_KEY_PATH") {
            self.identity.rsa_public_key_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SECURECHAN_IDENTITY__ECDSA_PRIVATE_KEY_PATH") {
            self.identity.ecdsa_private_key_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SECURECHAN_IDENTITY__ECDSA_PUBLIC_KEY_PATH") {
            self.identity.ecdsa_public_key_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SECURECHAN_TTL__HANDSHAKE_NONCE_SECS") {
            if let Ok(secs) = v.parse() {
                self.ttl.handshake_nonce_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SECURECHAN_TTL__SESSION_NONCE_SECS") {
            if let Ok(secs) = v.parse() {
                self.ttl.session_nonce_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SECURECHAN_TTL__SESSION_KEY_SECS") {
            if let Ok(secs) = v.parse() {
                self.ttl.session_key_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SECURECHAN_TTL__CLIENT_PUBKEY_SECS") {
            if let Ok(secs) = v.parse() {
                self.ttl.client_pubkey_ttl = Duration::from_secs(secs);
            }
        }
    }
}

/// `Duration`'s default serde representation is a `{secs, nanos}` struct;
/// the config file stores each TTL as a single integer number of seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(de)?))
    }
}
