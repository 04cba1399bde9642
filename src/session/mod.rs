//! Connection Session
//!
//! A session owns one WebSocket connection for its whole life:
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──▶ Open ──▶ Closing ──close──▶ Closed
//!                               │                                    ▲
//!                               └──────────── connect failed ────────┘
//! ```
//!
//! There is no way back to `Open`; a new session is created to talk again.

mod error;
mod ws;

pub use error::{ConnectError, ReceiveError, SendError};
pub use ws::WsSession;

use async_trait::async_trait;
use std::fmt;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A data frame surfaced by [`Session::receive`]
///
/// Ping/pong control frames are answered by the transport and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Peer sent a close frame or the stream ended
    Close,
}

/// Operations the exchange loop drives, in strict sequence
#[async_trait]
pub trait Session: Send {
    /// Establish the transport connection
    async fn connect(&mut self, address: &str) -> Result<(), ConnectError>;

    /// Transmit one complete text frame
    async fn send(&mut self, text: &str) -> Result<(), SendError>;

    /// Wait for the next text, binary or close frame
    async fn receive(&mut self) -> Result<Frame, ReceiveError>;

    /// Send a normal closure and release the transport. Safe to call repeatedly.
    async fn close(&mut self);

    fn state(&self) -> SessionState;
}
