//! Status Events
//!
//! Fire-and-forget notifications for whatever surfaces the client's state to a
//! person (the CLI logs them). Delivery never blocks and a dropped receiver
//! is ignored.

use std::fmt;
use tokio::sync::mpsc;

/// Lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Session opened
    Connected,
    /// Session closed, by the peer or after a cycle
    ConnectionClosed,
    /// Client was stopped
    Disconnected,
    /// Any failure, with its error text
    Error(String),
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Connected => f.write_str("Connected"),
            StatusEvent::ConnectionClosed => f.write_str("Connection closed"),
            StatusEvent::Disconnected => f.write_str("Disconnected"),
            StatusEvent::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Receiving half handed to the status consumer
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Sending half shared by the client and its loop task
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

/// Create a connected sender/receiver pair
pub fn channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender { tx }, rx)
}

impl StatusSender {
    pub fn emit(&self, event: StatusEvent) {
        tracing::trace!(event = %event, "Status event");
        let _ = self.tx.send(event);
    }

    /// Emit an `Error` event carrying the display text of `err`
    pub fn error(&self, err: &dyn std::error::Error) {
        self.emit(StatusEvent::Error(err.to_string()));
    }
}
