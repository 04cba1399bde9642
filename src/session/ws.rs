//! WebSocket Session
//!
//! [`Session`] implementation over a `tokio-tungstenite` client stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::error::{ConnectError, ReceiveError, SendError};
use super::{Frame, Session, SessionState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Single-use WebSocket client session
pub struct WsSession {
    /// Identifier used in log fields
    id: String,
    endpoint: Option<String>,
    state: SessionState,
    stream: Option<WsStream>,
}

impl WsSession {
    /// Create a disconnected session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint: None,
            state: SessionState::Disconnected,
            stream: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address passed to the last `connect` call
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    async fn open_stream(address: &str) -> Result<WsStream, ConnectError> {
        let request = address
            .into_client_request()
            .map_err(|e| ConnectError::InvalidUrl {
                url: address.to_string(),
                reason: e.to_string(),
            })?;

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| connect_error(address, e))?;

        Ok(stream)
    }
}

impl Default for WsSession {
    fn default() -> Self {
        Self::new()
    }
}

fn connect_error(url: &str, err: WsError) -> ConnectError {
    match err {
        WsError::Url(e) => ConnectError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        },
        WsError::Io(e) => ConnectError::Unreachable {
            url: url.to_string(),
            source: e,
        },
        other => ConnectError::Handshake {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl Session for WsSession {
    async fn connect(&mut self, address: &str) -> Result<(), ConnectError> {
        if self.state != SessionState::Disconnected {
            return Err(ConnectError::InvalidState(self.state));
        }

        self.state = SessionState::Connecting;
        self.endpoint = Some(address.to_string());

        match Self::open_stream(address).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = SessionState::Open;
                tracing::info!(session_id = %self.id, url = %address, "WebSocket connected");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                tracing::warn!(session_id = %self.id, url = %address, error = %e, "WebSocket connect failed");
                Err(e)
            }
        }
    }

    async fn send(&mut self, text: &str) -> Result<(), SendError> {
        if self.state != SessionState::Open {
            return Err(SendError::NotOpen(self.state));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or(SendError::NotOpen(self.state))?;

        if let Err(e) = stream.send(Message::Text(text.to_string())).await {
            self.state = SessionState::Closing;
            return Err(SendError::Transport(e.to_string()));
        }

        tracing::trace!(session_id = %self.id, bytes = text.len(), "Sent text frame");
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, ReceiveError> {
        if self.state != SessionState::Open {
            return Err(ReceiveError::NotOpen(self.state));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or(ReceiveError::NotOpen(self.state))?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                // Pongs are queued by tungstenite itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(session_id = %self.id, frame = ?frame, "Peer sent close frame");
                    self.state = SessionState::Closing;
                    return Ok(Frame::Close);
                }
                None => {
                    tracing::debug!(session_id = %self.id, "WebSocket stream ended");
                    self.state = SessionState::Closing;
                    return Ok(Frame::Close);
                }
                Some(Err(e)) => {
                    self.state = SessionState::Closing;
                    return Err(ReceiveError::Transport(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;

        if let Some(mut stream) = self.stream.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Cow::Borrowed(""),
            };
            // Fails once the peer has already completed the close handshake
            if let Err(e) = stream.close(Some(frame)).await {
                tracing::debug!(session_id = %self.id, error = %e, "Close frame not delivered");
            }
        }

        self.state = SessionState::Closed;
        tracing::info!(session_id = %self.id, "WebSocket closed");
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_ws_server, unused_address};
    use axum::extract::ws::Message as ServerMessage;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_send_and_receive_text() {
        let url = spawn_ws_server(|mut socket| async move {
            while let Some(Ok(ServerMessage::Text(text))) = socket.recv().await {
                let reply = format!("echo:{}", text);
                if socket.send(ServerMessage::Text(reply)).await.is_err() {
                    break;
                }
            }
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.endpoint(), Some(url.as_str()));

        session.send("ping").await.unwrap();
        assert_eq!(
            session.receive().await.unwrap(),
            Frame::Text("echo:ping".to_string())
        );

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let url = spawn_ws_server(|mut socket| async move {
            while socket.recv().await.is_some() {}
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();

        session.close().await;
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_peer_close_frame() {
        let url = spawn_ws_server(|mut socket| async move {
            let _ = socket.send(ServerMessage::Close(None)).await;
            while socket.recv().await.is_some() {}
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();

        assert_eq!(session.receive().await.unwrap(), Frame::Close);
        assert_eq!(session.state(), SessionState::Closing);

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_binary_frame_surfaces() {
        let url = spawn_ws_server(|mut socket| async move {
            let _ = socket.send(ServerMessage::Binary(vec![1, 2])).await;
            while socket.recv().await.is_some() {}
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();
        assert_eq!(session.receive().await.unwrap(), Frame::Binary(vec![1, 2]));
        session.close().await;
    }

    #[tokio::test]
    async fn test_server_receives_normal_closure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let url = spawn_ws_server(move |mut socket| {
            let tx = tx.clone();
            async move {
                while let Some(Ok(msg)) = socket.recv().await {
                    if let ServerMessage::Close(frame) = msg {
                        let _ = tx.send(frame.map(|f| f.code));
                        break;
                    }
                }
            }
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();
        session.close().await;

        let code = rx.recv().await.unwrap();
        assert_eq!(code, Some(1000));
    }

    #[tokio::test]
    async fn test_operations_require_open_session() {
        let mut session = WsSession::new();
        assert_eq!(session.state(), SessionState::Disconnected);

        assert!(matches!(
            session.send("ping").await,
            Err(SendError::NotOpen(SessionState::Disconnected))
        ));
        assert!(matches!(
            session.receive().await,
            Err(ReceiveError::NotOpen(SessionState::Disconnected))
        ));

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let url = unused_address().await;

        let mut session = WsSession::new();
        let err = session.connect(&url).await.unwrap_err();

        assert!(matches!(err, ConnectError::Unreachable { .. }));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let mut session = WsSession::new();
        let err = session.connect("not a url").await.unwrap_err();

        assert!(matches!(err, ConnectError::InvalidUrl { .. }));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_no_reconnect_after_close() {
        let url = spawn_ws_server(|mut socket| async move {
            while socket.recv().await.is_some() {}
        })
        .await;

        let mut session = WsSession::new();
        session.connect(&url).await.unwrap();
        session.close().await;

        let err = session.connect(&url).await.unwrap_err();
        assert!(matches!(err, ConnectError::InvalidState(SessionState::Closed)));
        assert!(matches!(
            session.send("ping").await,
            Err(SendError::NotOpen(SessionState::Closed))
        ));
    }
}
