//! Protocol and signaling errors.

use thiserror::Error;

/// Errors surfaced by the signaling client and the code codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The server rejected the sub-protocol token at upgrade time.
    #[error("server speaks a different protocol version")]
    BadVersion,

    /// A received sealed frame failed authentication. Terminal for the
    /// session; callers must not retry.
    #[error("bad key: sealed frame failed authentication")]
    BadKey,

    /// The joined slot does not exist on the server.
    #[error("no such slot")]
    NoSuchSlot,

    /// The allocated slot timed out before a peer joined.
    #[error("slot timed out waiting for a peer")]
    SlotTimedOut,

    /// The server has no slot available to allocate.
    #[error("no more slots available")]
    NoMoreSlots,

    /// A code string failed to decode under every accepted form.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// A frame arrived that the current state does not accept.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The transport collaborator reported an unrecoverable error.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The 30-second establishment budget was exceeded.
    #[error("timed out establishing transport")]
    Timeout,

    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,

    /// Transport-layer I/O error on the signaling connection.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
