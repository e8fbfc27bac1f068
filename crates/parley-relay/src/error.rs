//! Rendezvous-server-side error taxonomy.

use parley_proto::wire::CloseCode;
use thiserror::Error;

/// Errors raised while driving one signaling connection.
///
/// Every variant maps onto a close code the connection is closed with;
/// the server never retries, it always closes the offending connection
/// with the most specific code available.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("client requested a subprotocol other than \"{0}\"")]
    WrongProto(String),
    #[error("no such slot")]
    NoSuchSlot,
    #[error("slot timed out waiting for a peer")]
    SlotTimedOut,
    #[error("no more slots available")]
    NoMoreSlots,
    #[error("peer sent a frame before pairing")]
    ProtocolViolation,
    #[error("peer hung up")]
    PeerHungUp,
    #[error("peer closed with a bad key")]
    BadKey,
    #[error("io error: {0}")]
    Io(String),
}

impl RelayError {
    /// The close code a connection failing with this error is closed with.
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::WrongProto(_) => CloseCode::WrongProto,
            Self::NoSuchSlot => CloseCode::NoSuchSlot,
            Self::SlotTimedOut => CloseCode::SlotTimedOut,
            Self::NoMoreSlots => CloseCode::NoMoreSlots,
            Self::ProtocolViolation => CloseCode::WebRTCFailed,
            Self::PeerHungUp => CloseCode::PeerHungUp,
            Self::BadKey => CloseCode::BadKey,
            Self::Io(_) => CloseCode::WebRTCFailed,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
