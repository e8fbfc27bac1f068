//! Error types for cryptographic operations

use thiserror::Error;

/// Result type alias using CryptoError
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Error during key generation
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A sealed frame failed authentication. Terminal for the session per the
    /// secretbox framing contract: any `bad_key` result ends the handshake.
    #[error("bad key: sealed frame failed authentication")]
    BadKey,

    /// PAKE protocol failure
    #[error("PAKE protocol failed: {0}")]
    PakeFailure(String),

    /// Invalid key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
