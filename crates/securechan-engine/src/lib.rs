//! Handshake engine and session-frame codec: the stateless, pure core of
//! the protocol. Every function here takes its stores as explicit
//! arguments rather than holding any of its own — the transport adapter
//! (`securechan-api`) owns construction and lifetime of those stores and is
//! the only thing that calls into this crate.

pub mod frame;
pub mod handshake;

pub use frame::{build as build_frame, parse as parse_frame, BuiltFrame};
pub use handshake::{
    finalize, init, FinalizeRequest, FinalizeResponse, InitRequest, InitResponse,
};
