//! Signaling protocol, code codec, and transport collaborator contract for
//! bootstrapping an authenticated peer-to-peer channel from a short code.

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod session;
pub mod transport;
pub mod wire;

pub use error::ProtocolError;
pub use session::{client_allocate, client_join, SignalingConnection, Wormhole};

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
