//! Transport Establisher collaborator contract.
//!
//! The signaling state machine treats the underlying peer-to-peer transport
//! as an opaque capability: it creates offers/answers, feeds candidates, and
//! eventually gets a duplex byte stream once the path opens. A real
//! implementation would wrap a WebRTC/ICE stack; that stack is out of scope
//! here. [`LoopbackTransport`] is the one concrete implementation this crate
//! ships, used by the state machine's own tests and by the client binary's
//! same-host demo path.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

use crate::wire::IceServer;
use crate::{ProtocolError, Result};

/// Opaque session description (SDP-equivalent), a small JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription(pub Value);

/// Opaque ICE candidate, a small JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate(pub Value);

/// How the data path ended up connecting, inspected after establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStats {
    /// Peers reached each other without a relay.
    Direct,
    /// Traffic tunnels through a TURN relay.
    Relay,
    /// Not yet determined.
    Unknown,
}

/// One established (or establishing) peer-to-peer connection.
#[allow(async_fn_in_trait)]
pub trait TransportConnection: Send {
    /// Create a local offer description.
    async fn create_offer(&mut self) -> Result<SessionDescription>;
    /// Create a local answer description in response to a remote offer.
    async fn create_answer(&mut self) -> Result<SessionDescription>;
    /// Apply a description this side generated.
    async fn set_local_description(&mut self, description: SessionDescription) -> Result<()>;
    /// Apply a description received from the peer.
    async fn set_remote_description(&mut self, description: SessionDescription) -> Result<()>;
    /// Feed a candidate received from the peer.
    async fn add_candidate(&mut self, candidate: Candidate) -> Result<()>;
    /// Poll for the next locally-discovered candidate, if any remain.
    async fn next_local_candidate(&mut self) -> Option<Candidate>;
    /// Resolve once the data path is open and ready for `read`/`write`.
    async fn wait_data_open(&mut self) -> Result<()>;
    /// Read one message from the open data path.
    async fn read(&mut self) -> Result<Vec<u8>>;
    /// Write one message to the open data path.
    async fn write(&mut self, data: &[u8]) -> Result<()>;
    /// Close the data path.
    async fn close(&mut self);
    /// How the path ended up connecting.
    fn path_stats(&self) -> PathStats;
}

/// Produces [`TransportConnection`]s given the ICE server hints published by
/// the rendezvous server.
#[allow(async_fn_in_trait)]
pub trait TransportEstablisher: Send + Sync {
    /// The connection type this establisher produces.
    type Connection: TransportConnection;

    /// Create a connection, given the server's advertised ICE servers.
    async fn new_connection(&self, ice_servers: Vec<IceServer>) -> Self::Connection;
}

/// An in-process loopback establisher. Two [`new_connection`] calls on the
/// same instance rendezvous on an internal one-shot slot and hand back the
/// two ends of a `tokio::io::duplex` pipe — the same booking/joining shape
/// as the rendezvous server's own slot table, just in memory.
///
/// [`new_connection`]: TransportEstablisher::new_connection
#[derive(Default, Clone)]
pub struct LoopbackTransport {
    rendezvous: Arc<Mutex<Option<DuplexStream>>>,
}

impl LoopbackTransport {
    /// A fresh, unpaired loopback establisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests: construct two already-linked connections
    /// without going through the establisher rendezvous.
    pub fn pair() -> (LoopbackConnection, LoopbackConnection) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (LoopbackConnection::new(a), LoopbackConnection::new(b))
    }
}

impl TransportEstablisher for LoopbackTransport {
    type Connection = LoopbackConnection;

    async fn new_connection(&self, _ice_servers: Vec<IceServer>) -> LoopbackConnection {
        let mut slot = self.rendezvous.lock().await;
        match slot.take() {
            Some(other_half) => LoopbackConnection::new(other_half),
            None => {
                let (mine, theirs) = tokio::io::duplex(64 * 1024);
                *slot = Some(theirs);
                LoopbackConnection::new(mine)
            }
        }
    }
}

/// One end of an in-memory duplex pipe, standing in for a real transport.
pub struct LoopbackConnection {
    stream: DuplexStream,
    candidate_emitted: bool,
}

impl LoopbackConnection {
    fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            candidate_emitted: false,
        }
    }
}

impl TransportConnection for LoopbackConnection {
    async fn create_offer(&mut self) -> Result<SessionDescription> {
        Ok(SessionDescription(
            serde_json::json!({"type": "offer", "sdp": "loopback"}),
        ))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription> {
        Ok(SessionDescription(
            serde_json::json!({"type": "answer", "sdp": "loopback"}),
        ))
    }

    async fn set_local_description(&mut self, _description: SessionDescription) -> Result<()> {
        Ok(())
    }

    async fn set_remote_description(&mut self, _description: SessionDescription) -> Result<()> {
        Ok(())
    }

    async fn add_candidate(&mut self, _candidate: Candidate) -> Result<()> {
        Ok(())
    }

    async fn next_local_candidate(&mut self) -> Option<Candidate> {
        if self.candidate_emitted {
            return None;
        }
        self.candidate_emitted = true;
        Some(Candidate(
            serde_json::json!({"candidate": "loopback", "sdpMid": "0"}),
        ))
    }

    async fn wait_data_open(&mut self) -> Result<()> {
        // The loopback pipe is already connected the moment it's created.
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        let mut len_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;
        let len = u32::from_be_bytes(len_bytes) as usize;
        let mut buf = vec![0u8; len];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;
        Ok(buf)
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len())
            .map_err(|_| ProtocolError::TransportFailure("message too large".into()))?;
        self.stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;
        self.stream
            .write_all(data)
            .await
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    fn path_stats(&self) -> PathStats {
        PathStats::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn paired_connections_exchange_a_message() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.write(b"sixteen byte msg").await.unwrap();
        let got = b.read().await.unwrap();
        assert_eq!(got, b"sixteen byte msg");
    }

    #[tokio::test]
    async fn establisher_links_two_new_connection_calls() {
        let transport = LoopbackTransport::new();
        let mut a = transport.new_connection(vec![]).await;
        let mut b = transport.new_connection(vec![]).await;

        a.write(b"hello").await.unwrap();
        assert_eq!(b.read().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn path_stats_is_always_direct() {
        let (a, _b) = LoopbackTransport::pair();
        assert_eq!(a.path_stats(), PathStats::Direct);
    }

    #[tokio::test]
    async fn local_candidate_emitted_exactly_once() {
        let (mut a, _b) = LoopbackTransport::pair();
        assert!(a.next_local_candidate().await.is_some());
        assert!(a.next_local_candidate().await.is_none());
    }
}
