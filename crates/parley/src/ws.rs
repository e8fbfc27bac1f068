//! A `SignalingConnection` over a real WebSocket to the rendezvous server.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use parley_proto::session::SignalingConnection;
use parley_proto::wire::{CloseCode, PROTOCOL_VERSION};
use parley_proto::{ProtocolError, Result};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The signaling connection to the rendezvous server, opened against the
/// root path for `allocate` or `/<slot>` for `join`.
pub struct WsSignaling {
    socket: Socket,
}

impl WsSignaling {
    /// Connect to `url`, negotiating the signaling sub-protocol.
    pub async fn connect(url: &str) -> Result<Self> {
        use tokio_tungstenite::tungstenite::client::IntoClientRequest;

        let mut request = url
            .into_client_request()
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;
        request.headers_mut().insert(
            "sec-websocket-protocol",
            PROTOCOL_VERSION.parse().expect("protocol version is a valid header value"),
        );

        let (socket, response) = connect_async(request)
            .await
            .map_err(|e| ProtocolError::TransportFailure(e.to_string()))?;

        let accepted = response
            .headers()
            .get("sec-websocket-protocol")
            .and_then(|v| v.to_str().ok());
        if accepted != Some(PROTOCOL_VERSION) {
            return Err(ProtocolError::BadVersion);
        }

        Ok(Self { socket })
    }
}

impl SignalingConnection for WsSignaling {
    async fn recv_text(&mut self) -> Result<String> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    return Err(close_frame_to_error(frame));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ProtocolError::Io(e.to_string())),
                None => return Err(ProtocolError::Io("signaling connection closed".into())),
            }
        }
    }

    async fn send_text(&mut self, frame: String) -> Result<()> {
        self.socket
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ProtocolError::Io(e.to_string()))
    }

    async fn close(&mut self, code: CloseCode) {
        let frame = CloseFrame {
            code: WsCloseCode::from(code.as_u16()),
            reason: String::new().into(),
        };
        let _ = self.socket.send(Message::Close(Some(frame))).await;
    }
}

fn close_frame_to_error(frame: Option<CloseFrame>) -> ProtocolError {
    match frame.and_then(|f| CloseCode::from_u16(u16::from(f.code))) {
        Some(CloseCode::NoSuchSlot) => ProtocolError::NoSuchSlot,
        Some(CloseCode::SlotTimedOut) => ProtocolError::SlotTimedOut,
        Some(CloseCode::NoMoreSlots) => ProtocolError::NoMoreSlots,
        Some(CloseCode::WrongProto) => ProtocolError::BadVersion,
        Some(CloseCode::BadKey) => ProtocolError::BadKey,
        _ => ProtocolError::Io("signaling connection closed".into()),
    }
}
