//! Cryptographic hash functions and domain-separation constants

pub mod blake3;
pub mod domain;

pub use self::blake3::{derive_key, hash, keyed_hash};
pub use domain::*;
