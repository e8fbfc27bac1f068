//! The signaling client state machine.
//!
//! One state machine drives both roles (`player_1`, the slot allocator, and
//! `player_2`, the joiner). Each state is a plain function from an inbound
//! event to the next state; a driver loop owns the signaling connection and
//! the transport collaborator and feeds events in. Candidate frames that
//! arrive before the local answer has been constructed are buffered and
//! drained the moment the machine reaches `await_candidates`, per the
//! transient re-entry behavior called out in the design notes.

use std::time::Duration;

use parley_crypto::pake;
use parley_crypto::symmetric::{open, seal};

use crate::codec;
use crate::transport::{Candidate, PathStats, SessionDescription, TransportConnection, TransportEstablisher};
use crate::wire::{CloseCode, IceServer, InitMessage};
use crate::{ProtocolError, Result};

const ESTABLISHMENT_TIMEOUT: Duration = Duration::from_secs(30);
const BYE: &str = "bye";

/// The signaling connection to the rendezvous server: one long-lived
/// bidirectional text-message stream. A real implementation wraps a
/// WebSocket; tests drive an in-process stand-in.
#[allow(async_fn_in_trait)]
pub trait SignalingConnection {
    /// Receive the next frame, or an error if the connection closed.
    async fn recv_text(&mut self) -> Result<String>;
    /// Send a frame.
    async fn send_text(&mut self, frame: String) -> Result<()>;
    /// Close the connection with the given status code.
    async fn close(&mut self, code: CloseCode);
}

/// An authenticated, established channel to the peer, returned once the
/// handshake and transport establishment both succeed.
pub struct Wormhole<C: TransportConnection> {
    connection: C,
    fingerprint: [u8; 8],
}

impl<C: TransportConnection> Wormhole<C> {
    /// The 8-byte fingerprint, meant to be compared out-of-band.
    pub fn fingerprint(&self) -> [u8; 8] {
        self.fingerprint
    }

    /// Read one message from the transport.
    pub async fn read(&mut self) -> Result<Vec<u8>> {
        self.connection.read().await
    }

    /// Write one message to the transport.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.connection.write(data).await
    }

    /// Close the transport.
    pub async fn close(&mut self) {
        self.connection.close().await;
    }

    /// Whether the data path ended up going through a TURN relay.
    pub fn is_relay(&self) -> bool {
        self.connection.path_stats() == PathStats::Relay
    }
}

/// Allocate a fresh slot and wait for a peer to join it.
///
/// `on_slot` is invoked with the human-readable code as soon as the server
/// assigns a slot, so the caller can display it before the handshake
/// proceeds.
pub async fn client_allocate<S, T>(
    pass: &[u8],
    signaling: &mut S,
    transport: &T,
    on_slot: impl FnOnce(&str),
) -> Result<Wormhole<T::Connection>>
where
    S: SignalingConnection,
    T: TransportEstablisher,
{
    let init = recv_init(signaling).await?;
    let slot = init
        .slot
        .ok_or_else(|| ProtocolError::ProtocolViolation("allocate response missing slot".into()))?;
    let slot_number: u64 = slot
        .parse()
        .map_err(|_| ProtocolError::ProtocolViolation("non-numeric slot".into()))?;
    on_slot(&codec::encode(slot_number, pass));

    let mut conn = transport.new_connection(init.ice_servers).await;

    // player_1: wait for msg_a, then respond and create the offer.
    let msg_a = recv_frame(signaling).await?;
    let (msg_b, master_key) = pake::exchange(pass, slot.as_bytes(), &msg_a)
        .map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;
    send_frame(signaling, &msg_b).await?;

    let session_key = derive_session_key(&master_key)?;
    let offer = conn.create_offer().await?;
    conn.set_local_description(offer.clone()).await?;
    send_sealed(signaling, &session_key, &description_json(&offer, "offer")?).await?;

    let mut pending = Vec::new();
    let answer = recv_remote_description(signaling, &session_key, "answer", &mut pending).await?;
    conn.set_remote_description(answer).await?;
    let fingerprint = derive_fingerprint(&session_key)?;

    drain_candidates(signaling, &mut conn, &session_key, pending).await?;
    finish(signaling, conn, fingerprint).await
}

/// Join a slot a peer already allocated.
pub async fn client_join<S, T>(
    slot: &str,
    pass: &[u8],
    signaling: &mut S,
    transport: &T,
) -> Result<Wormhole<T::Connection>>
where
    S: SignalingConnection,
    T: TransportEstablisher,
{
    let init = recv_init(signaling).await?;
    let mut conn = transport.new_connection(init.ice_servers).await;

    // player_2: send msg_a first, then wait for msg_b.
    let (msg_a, state) = pake::start(pass, slot.as_bytes());
    send_frame(signaling, &msg_a).await?;

    let msg_b = recv_frame(signaling).await?;
    let master_key = pake::finish(state, &msg_b).map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;
    let session_key = derive_session_key(&master_key)?;

    let mut pending = Vec::new();
    let offer = recv_remote_description(signaling, &session_key, "offer", &mut pending).await?;
    conn.set_remote_description(offer).await?;

    let answer = conn.create_answer().await?;
    conn.set_local_description(answer.clone()).await?;
    send_sealed(signaling, &session_key, &description_json(&answer, "answer")?).await?;
    let fingerprint = derive_fingerprint(&session_key)?;

    drain_candidates(signaling, &mut conn, &session_key, pending).await?;
    finish(signaling, conn, fingerprint).await
}

fn derive_session_key(master_key: &[u8; 32]) -> Result<[u8; 32]> {
    let bytes = parley_crypto::kdf::derive(&[], master_key, &[], 32)
        .map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ProtocolError::ProtocolViolation("session key derivation produced wrong length".into()))
}

fn derive_fingerprint(session_key: &[u8; 32]) -> Result<[u8; 8]> {
    let bytes = parley_crypto::kdf::derive(&[], session_key, b"fingerprint", 8)
        .map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ProtocolError::ProtocolViolation("fingerprint derivation produced wrong length".into()))
}

fn description_json(description: &SessionDescription, kind: &str) -> Result<Vec<u8>> {
    let mut value = description.0.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.entry("type").or_insert_with(|| kind.into());
    }
    serde_json::to_vec(&value).map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))
}

async fn recv_init<S: SignalingConnection>(signaling: &mut S) -> Result<InitMessage> {
    let frame = signaling.recv_text().await?;
    serde_json::from_str(&frame).map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))
}

async fn recv_frame<S: SignalingConnection>(signaling: &mut S) -> Result<Vec<u8>> {
    let frame = signaling.recv_text().await?;
    base64_decode(&frame)
}

async fn send_frame<S: SignalingConnection>(signaling: &mut S, bytes: &[u8]) -> Result<()> {
    signaling.send_text(base64_encode(bytes)).await
}

async fn send_sealed<S: SignalingConnection>(
    signaling: &mut S,
    session_key: &[u8; 32],
    plaintext: &[u8],
) -> Result<()> {
    signaling.send_text(seal(session_key, plaintext)).await
}

/// Receive sealed frames until one decodes as a description of `expected_kind`
/// (`"offer"` or `"answer"`). Any other sealed frame received in the
/// meantime (a candidate arriving early) is buffered in `pending` rather
/// than discarded.
async fn recv_remote_description<S: SignalingConnection>(
    signaling: &mut S,
    session_key: &[u8; 32],
    expected_kind: &str,
    pending: &mut Vec<Vec<u8>>,
) -> Result<SessionDescription> {
    loop {
        let frame = signaling.recv_text().await?;
        let plaintext = open_or_bye(signaling, session_key, &frame).await?;
        let value: serde_json::Value = serde_json::from_slice(&plaintext)
            .map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;

        match value.get("type").and_then(|t| t.as_str()) {
            Some(kind) if kind == expected_kind => return Ok(SessionDescription(value)),
            _ => pending.push(plaintext),
        }
    }
}

async fn open_or_bye<S: SignalingConnection>(
    signaling: &mut S,
    session_key: &[u8; 32],
    frame: &str,
) -> Result<Vec<u8>> {
    match open(session_key, frame) {
        Ok(plaintext) => Ok(plaintext),
        Err(_) => {
            let _ = send_sealed(signaling, session_key, BYE.as_bytes()).await;
            signaling.close(CloseCode::BadKey).await;
            Err(ProtocolError::BadKey)
        }
    }
}

/// Process any buffered early-arriving candidates, then keep receiving and
/// forwarding candidates (and sending any locally-discovered ones) until the
/// transport signals the data path is open.
async fn drain_candidates<S, C>(
    signaling: &mut S,
    conn: &mut C,
    session_key: &[u8; 32],
    pending: Vec<Vec<u8>>,
) -> Result<()>
where
    S: SignalingConnection,
    C: TransportConnection,
{
    for plaintext in pending {
        apply_candidate(conn, &plaintext).await?;
    }

    let deadline = tokio::time::Instant::now() + ESTABLISHMENT_TIMEOUT;
    loop {
        if conn.wait_data_open().await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ProtocolError::Timeout);
        }

        while let Some(candidate) = conn.next_local_candidate().await {
            let payload = candidate_json(&candidate)?;
            send_sealed(signaling, session_key, &payload).await?;
        }

        match tokio::time::timeout(Duration::from_millis(50), signaling.recv_text()).await {
            Ok(Ok(frame)) => match open(session_key, &frame) {
                Ok(plaintext) if plaintext == BYE.as_bytes() => return Err(ProtocolError::BadKey),
                Ok(plaintext) => apply_candidate(conn, &plaintext).await?,
                Err(_) => return Err(ProtocolError::BadKey),
            },
            Ok(Err(e)) => return Err(e),
            Err(_) => {}
        }
    }
}

async fn apply_candidate<C: TransportConnection>(conn: &mut C, plaintext: &[u8]) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_slice(plaintext).map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))?;
    conn.add_candidate(Candidate(value)).await
}

fn candidate_json(candidate: &Candidate) -> Result<Vec<u8>> {
    serde_json::to_vec(&candidate.0).map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))
}

async fn finish<S, C>(signaling: &mut S, conn: C, fingerprint: [u8; 8]) -> Result<Wormhole<C>>
where
    S: SignalingConnection,
    C: TransportConnection,
{
    let code = match conn.path_stats() {
        PathStats::Direct => CloseCode::WebRTCSuccessDirect,
        PathStats::Relay => CloseCode::WebRTCSuccessRelay,
        PathStats::Unknown => CloseCode::WebRTCSuccess,
    };
    signaling.close(code).await;
    Ok(Wormhole {
        connection: conn,
        fingerprint,
    })
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    URL_SAFE_NO_PAD.encode(bytes)
}

fn base64_decode(text: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| ProtocolError::ProtocolViolation(e.to_string()))
}

/// A catalog entry for the server's initial ICE hint list, used by tests that
/// build a fake [`InitMessage`] without pulling in the relay crate.
pub fn ice_server(url: &str) -> IceServer {
    IceServer {
        urls: vec![url.to_string()],
        username: None,
        credential: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use tokio::sync::mpsc;

    /// An in-process signaling connection backed by channels, standing in
    /// for the WebSocket to the rendezvous server.
    struct ChannelSignaling {
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<String>,
        closed: Option<CloseCode>,
    }

    impl SignalingConnection for ChannelSignaling {
        async fn recv_text(&mut self) -> Result<String> {
            self.inbound
                .recv()
                .await
                .ok_or_else(|| ProtocolError::ProtocolViolation("signaling closed".into()))
        }

        async fn send_text(&mut self, frame: String) -> Result<()> {
            self.outbound
                .send(frame)
                .map_err(|_| ProtocolError::ProtocolViolation("peer gone".into()))
        }

        async fn close(&mut self, code: CloseCode) {
            self.closed = Some(code);
        }
    }

    /// Wires up two `ChannelSignaling` ends plus a shared `InitMessage`
    /// relay, exactly mimicking what the rendezvous server would deliver.
    fn signaling_pair(slot: &str) -> (ChannelSignaling, ChannelSignaling) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let init_allocator = InitMessage {
            slot: Some(slot.to_string()),
            ice_servers: vec![ice_server("stun:stun.example.org:3478")],
        };
        let init_joiner = InitMessage {
            slot: None,
            ice_servers: vec![ice_server("stun:stun.example.org:3478")],
        };

        a_tx.send(serde_json::to_string(&init_allocator).unwrap()).unwrap();
        b_tx.send(serde_json::to_string(&init_joiner).unwrap()).unwrap();

        (
            ChannelSignaling {
                inbound: a_rx,
                outbound: b_tx,
                closed: None,
            },
            ChannelSignaling {
                inbound: b_rx,
                outbound: a_tx,
                closed: None,
            },
        )
    }

    #[tokio::test]
    async fn allocate_and_join_converge_on_session_key_and_exchange_data() {
        let (mut allocator_signaling, mut joiner_signaling) = signaling_pair("77");
        let transport = LoopbackTransport::new();
        let transport_for_joiner = transport.clone();

        let pass = b"correct horse battery staple";

        let allocator = tokio::spawn(async move {
            client_allocate(pass, &mut allocator_signaling, &transport, |_code| {}).await
        });
        let joiner = tokio::spawn(async move {
            client_join("77", pass, &mut joiner_signaling, &transport_for_joiner).await
        });

        let (mut a_wormhole, mut b_wormhole) = (
            allocator.await.unwrap().unwrap(),
            joiner.await.unwrap().unwrap(),
        );

        assert_eq!(a_wormhole.fingerprint(), b_wormhole.fingerprint());

        a_wormhole.write(b"sixteen byte msg").await.unwrap();
        let got = b_wormhole.read().await.unwrap();
        assert_eq!(got, b"sixteen byte msg");

        assert!(!a_wormhole.is_relay());
    }

    #[tokio::test]
    async fn mismatched_password_surfaces_bad_key() {
        let (mut allocator_signaling, mut joiner_signaling) = signaling_pair("99");
        let transport = LoopbackTransport::new();
        let transport_for_joiner = transport.clone();

        let allocator = tokio::spawn(async move {
            client_allocate(b"password-a", &mut allocator_signaling, &transport, |_| {}).await
        });
        let joiner = tokio::spawn(async move {
            client_join("99", b"password-b", &mut joiner_signaling, &transport_for_joiner).await
        });

        let allocator_result = allocator.await.unwrap();
        let joiner_result = joiner.await.unwrap();

        assert!(allocator_result.is_err() || joiner_result.is_err());
    }
}
