//! Core primitives for the secure channel: crypto wrappers, transcript
//! builders, configuration, and the exhaustive protocol error type.
//!
//! This crate has no knowledge of HTTP, stores, or the handshake state
//! machine itself — those live in `securechan-services`, `securechan-api`,
//! and `securechan-engine` respectively.

pub mod config;
pub mod crypto;
pub mod error;
pub mod transcript;

pub use error::SecureChanError;
