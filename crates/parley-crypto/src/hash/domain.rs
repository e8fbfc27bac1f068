//! Domain separation constants for cryptographic operations
//!
//! These constants ensure that cryptographic operations in different contexts
//! produce different outputs, even with the same inputs.

/// Domain separator for the CPace generator derivation
pub const DOMAIN_PAKE: &str = "parley.pake.cpace.v1";

/// Domain separator for deriving the CPace session key from the shared point
pub const DOMAIN_PAKE_SESSION: &str = "parley.pake.session_key.v1";

/// Domain separator for the HKDF `session_key` sub-key
pub const DOMAIN_SESSION_KEY: &str = "parley.session_key.v1";

/// Domain separator for the HKDF `fingerprint` sub-key
pub const DOMAIN_FINGERPRINT: &str = "fingerprint";
