//! Exit code constants

/// Success exit code
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// The peer's key did not match ours (wrong code, or tampering)
pub const AUTH_FAILURE: i32 = 2;

/// The user interrupted the operation, or the slot timed out waiting for a peer
pub const CANCELLED: i32 = 3;

/// The rendezvous server or transport could not be reached
pub const NETWORK_ERROR: i32 = 4;
