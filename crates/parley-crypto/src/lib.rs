//! # parley-crypto
//!
//! Cryptographic primitives backing the parley rendezvous-and-handshake core:
//! CPace (password-authenticated key exchange), HKDF-SHA256 key derivation,
//! and secretbox-style authenticated framing of session metadata.
//!
//! ## Features
//!
//! - **CPace over Ristretto255**: a symmetric PAKE that derives its generator
//!   from the shared password and a channel-binding session id, so an
//!   attacker who doesn't know the password gets exactly one online guess.
//! - **HKDF-SHA256 sub-key separation**: session keys and fingerprints are
//!   derived from the same master key with disjoint `info` labels.
//! - **Secretbox framing**: XChaCha20-Poly1305 with a random 24-byte nonce
//!   per message, matching the NaCl secretbox construction's envelope shape.
//! - **Zeroization**: PAKE state and derived keys are wiped on drop.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod kdf;
pub mod pake;
pub mod symmetric;

// Re-export commonly used types
pub use error::{CryptoError, Result};
pub use hash::blake3;

/// Library version constant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
