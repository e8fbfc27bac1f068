//! Key derivation functions
//!
//! HKDF-SHA256 is the sole KDF used by the handshake: `session_key` and
//! `fingerprint` are both sub-keys of the CPace master key, separated by
//! `info` label rather than by algorithm.

pub mod hkdf;

pub use self::hkdf::derive;
