//! JSON messages exchanged between a client and the rendezvous server.

use serde::{Deserialize, Serialize};

/// Sub-protocol token negotiated at WebSocket upgrade. A mismatch closes the
/// connection with [`crate::wire::CloseCode::BadVersion`] before any
/// application frame is read.
pub const PROTOCOL_VERSION: &str = "4";

/// One STUN or TURN server hint published by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServer {
    /// One or more URLs for this server (`stun:` or `turn:`).
    pub urls: Vec<String>,
    /// TURN username, present only for TURN entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential, present only for TURN entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// First frame the server sends to each newly-arrived peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitMessage {
    /// The newly-assigned slot identifier; present only for the allocating
    /// peer, absent for a peer joining an existing slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// The current ICE server list.
    #[serde(rename = "iceServers")]
    pub ice_servers: Vec<IceServer>,
}
