//! Symmetric encryption primitives
//!
//! The handshake needs exactly one authenticated-encryption construction:
//! secretbox-style framing of session metadata with a random per-message
//! nonce. See [`secretbox`].

pub mod secretbox;

pub use secretbox::{open, seal};
