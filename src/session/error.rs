//! Session error types
//!
//! One enum per session operation, so the exchange loop can tell which step
//! of a cycle failed.

use super::SessionState;
use thiserror::Error;

/// Errors from establishing the connection
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Address is not a usable `ws://` URL
    #[error("Invalid WebSocket address {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// TCP connection could not be established
    #[error("Endpoint {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connected but the WebSocket upgrade was refused or malformed
    #[error("WebSocket handshake with {url} failed: {reason}")]
    Handshake { url: String, reason: String },

    /// Sessions connect once; a new session is needed after close
    #[error("Session cannot connect from state {0}")]
    InvalidState(SessionState),
}

/// Errors from sending a text frame
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Session is not open (state: {0})")]
    NotOpen(SessionState),

    #[error("Send failed: {0}")]
    Transport(String),
}

/// Errors from waiting on the next frame
#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("Session is not open (state: {0})")]
    NotOpen(SessionState),

    #[error("Receive failed: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SendError::NotOpen(SessionState::Closed);
        assert_eq!(err.to_string(), "Session is not open (state: closed)");

        let err = ConnectError::InvalidState(SessionState::Open);
        assert_eq!(err.to_string(), "Session cannot connect from state open");
    }
}
