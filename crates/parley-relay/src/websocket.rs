//! WebSocket transport for the rendezvous protocol.
//!
//! One axum route handles allocation (`/`), another handles joining
//! (`/{slot}`); both converge on [`drive_connection`], which walks the
//! per-connection state machine of §4.4: START -> BOOKED/JOINED ->
//! PAIRED -> RELAYING -> CLOSED.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};

use parley_proto::wire::{CloseCode, IceServer, InitMessage, PROTOCOL_VERSION};

use crate::config::RelayConfig;
use crate::counters::Counters;
use crate::error::RelayError;
use crate::ice;
use crate::slot::{join_peer, RelayFrame, SlotTable};

/// Shared server state handed to every connection task.
pub struct RelayState {
    pub slots: SlotTable,
    pub config: RelayConfig,
    pub counters: Arc<Counters>,
    connections: AtomicUsize,
}

impl RelayState {
    pub fn new(slots: SlotTable, config: RelayConfig, counters: Arc<Counters>) -> Self {
        Self {
            slots,
            config,
            counters,
            connections: AtomicUsize::new(0),
        }
    }
}

/// Releases the connection slot counted against `config.max_connections`
/// when a connection task ends, however it ends.
struct ConnectionGuard<'a>(&'a AtomicUsize);

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(allocate_handler))
        .route("/{slot}", get(join_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn allocate_handler(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.protocols([PROTOCOL_VERSION])
        .on_upgrade(move |socket| {
            async move { drive_connection(socket, state, &headers, None).await }
                .instrument(info_span!("relay_connection", role = "allocate"))
        })
}

async fn join_handler(
    State(state): State<Arc<RelayState>>,
    Path(slot): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.protocols([PROTOCOL_VERSION])
        .on_upgrade(move |socket| {
            async move { drive_connection(socket, state, &headers, Some(slot)).await }
                .instrument(info_span!("relay_connection", role = "join"))
        })
}

fn requested_protocol_ok(headers: &HeaderMap) -> bool {
    headers
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(|value| value.split(',').any(|p| p.trim() == PROTOCOL_VERSION))
        .unwrap_or(false)
}

async fn drive_connection(
    socket: WebSocket,
    state: Arc<RelayState>,
    headers: &HeaderMap,
    join_slot: Option<String>,
) {
    let (mut sink, mut stream) = socket.split();

    if !requested_protocol_ok(headers) {
        state.counters.record_bad_proto();
        close_with(&mut sink, RelayError::WrongProto(PROTOCOL_VERSION.to_string())).await;
        return;
    }

    if state.connections.fetch_add(1, Ordering::Relaxed) >= state.config.max_connections {
        state.connections.fetch_sub(1, Ordering::Relaxed);
        close_with(&mut sink, RelayError::NoMoreSlots).await;
        return;
    }
    let _guard = ConnectionGuard(&state.connections);

    let result = match join_slot {
        None => run_allocator(&state, &mut sink, &mut stream).await,
        Some(slot) => run_joiner(&state, &mut sink, &mut stream, slot).await,
    };

    if let Err(err) = result {
        info!(code = ?err.close_code(), "closing connection");
        close_with(&mut sink, err).await;
    }
}

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

async fn run_allocator(
    state: &Arc<RelayState>,
    sink: &mut WsSink,
    stream: &mut WsStream,
) -> Result<(), RelayError> {
    let booking = state.slots.allocate().await?;
    let slot = booking.slot.clone();
    info!(slot = %slot, "booked");

    let ice_servers = ice::ice_servers(&state.config, state.config.slot_timeout());
    send_init(sink, Some(slot.clone()), ice_servers).await?;

    // A frame arriving on `stream` before pairing completes is a protocol
    // violation (§8): the server must not forward it, so it races the
    // pairing wait rather than sitting unread until `relay` starts polling.
    let peer = tokio::select! {
        result = booking.await_peer(state.config.slot_timeout(), &state.counters) => result,
        frame = stream.next() => {
            state.slots.forget(&slot).await;
            return Err(frame_before_pairing(frame));
        }
    };
    let (to_peer, from_peer) = match peer {
        Ok(pair) => {
            state.counters.record_rendezvous();
            pair
        }
        Err(err) => {
            state.slots.forget(&slot).await;
            return Err(err);
        }
    };
    info!(slot = %slot, "paired");

    relay(sink, stream, to_peer, from_peer).await
}

async fn run_joiner(
    state: &Arc<RelayState>,
    sink: &mut WsSink,
    stream: &mut WsStream,
    slot: String,
) -> Result<(), RelayError> {
    let deliver = state.slots.take(&slot).await?;
    info!(slot = %slot, "joined");

    let ice_servers = ice::ice_servers(&state.config, state.config.slot_timeout());
    send_init(sink, None, ice_servers).await?;

    let (to_peer, from_peer) = tokio::select! {
        result = join_peer(deliver) => {
            let pair = result?;
            state.counters.record_rendezvous();
            pair
        }
        frame = stream.next() => return Err(frame_before_pairing(frame)),
    };
    info!(slot = %slot, "paired");

    relay(sink, stream, to_peer, from_peer).await
}

/// A frame received while still waiting for pairing is a protocol
/// violation; the connection never gets as far as forwarding it.
fn frame_before_pairing(frame: Option<Result<Message, axum::Error>>) -> RelayError {
    match frame {
        Some(Ok(_)) => RelayError::ProtocolViolation,
        Some(Err(e)) => RelayError::Io(e.to_string()),
        None => RelayError::PeerHungUp,
    }
}

async fn send_init(
    sink: &mut WsSink,
    slot: Option<String>,
    ice_servers: Vec<IceServer>,
) -> Result<(), RelayError> {
    let init = InitMessage { slot, ice_servers };
    let text = serde_json::to_string(&init).expect("InitMessage always serializes");
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| RelayError::Io(e.to_string()))
}

/// PAIRED -> RELAYING -> CLOSED: forward every frame from either side to
/// the other, verbatim, until one side closes or errors.
async fn relay(
    sink: &mut WsSink,
    stream: &mut WsStream,
    to_peer: mpsc::Sender<RelayFrame>,
    mut from_peer: mpsc::Receiver<RelayFrame>,
) -> Result<(), RelayError> {
    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if to_peer.send(text.to_string()).await.is_err() {
                            return Err(RelayError::PeerHungUp);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Err(close_reason(frame));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(RelayError::Io(e.to_string())),
                    None => return Err(RelayError::PeerHungUp),
                }
            }
            outgoing = from_peer.recv() => {
                match outgoing {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            return Err(RelayError::PeerHungUp);
                        }
                    }
                    None => return Err(RelayError::PeerHungUp),
                }
            }
        }
    }
}

/// RELAYING -> CLOSED propagation rule: a peer closing with `BadKey`
/// propagates `BadKey`; anything else propagates as `PeerHungUp`.
fn close_reason(frame: Option<CloseFrame>) -> RelayError {
    match frame.and_then(|f| CloseCode::from_u16(f.code)) {
        Some(CloseCode::BadKey) => RelayError::BadKey,
        _ => RelayError::PeerHungUp,
    }
}

async fn close_with(sink: &mut WsSink, err: RelayError) {
    let code = err.close_code();
    let frame = CloseFrame {
        code: code.as_u16(),
        reason: err.to_string().into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        warn!(error = %e, "failed to send close frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> Arc<RelayState> {
        let counters = Arc::new(Counters::default());
        Arc::new(RelayState::new(
            SlotTable::new(Arc::clone(&counters)),
            RelayConfig::default(),
            counters,
        ))
    }

    #[test]
    fn requested_protocol_ok_accepts_exact_and_listed_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-websocket-protocol", "4".parse().unwrap());
        assert!(requested_protocol_ok(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("sec-websocket-protocol", "3, 4".parse().unwrap());
        assert!(requested_protocol_ok(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("sec-websocket-protocol", "3".parse().unwrap());
        assert!(!requested_protocol_ok(&headers));

        assert!(!requested_protocol_ok(&HeaderMap::new()));
    }

    #[test]
    fn close_reason_propagates_bad_key_and_defaults_to_peer_hung_up() {
        let bad_key = CloseFrame {
            code: CloseCode::BadKey.as_u16(),
            reason: "".into(),
        };
        assert!(matches!(close_reason(Some(bad_key)), RelayError::BadKey));
        assert!(matches!(close_reason(None), RelayError::PeerHungUp));
    }

    #[test]
    fn connection_guard_releases_its_slot_on_drop() {
        let counters = Arc::new(Counters::default());
        let state = RelayState::new(
            SlotTable::new(Arc::clone(&counters)),
            RelayConfig {
                max_connections: 1,
                ..RelayConfig::default()
            },
            counters,
        );

        assert!(state.connections.fetch_add(1, Ordering::Relaxed) < state.config.max_connections);
        {
            let _guard = ConnectionGuard(&state.connections);
            assert_eq!(state.connections.load(Ordering::Relaxed), 1);
        }
        assert_eq!(state.connections.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn frame_before_pairing_is_a_protocol_violation_and_absence_is_peer_hung_up() {
        assert!(matches!(
            frame_before_pairing(Some(Ok(Message::Text("early".into())))),
            RelayError::ProtocolViolation
        ));
        assert!(matches!(frame_before_pairing(None), RelayError::PeerHungUp));
    }

    #[tokio::test]
    async fn health_endpoint_returns_200() {
        let app = router(state());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
