//! Exchange Loop
//!
//! Drives a [`Session`] through liveness cycles:
//!
//! 1. send the probe text
//! 2. wait for a frame
//! 3. close frame → close the session, report, stop
//! 4. text frame → fetch a snapshot and send it back
//! 5. failures are reported as status events
//! 6. close the session after the cycle (when `close_after_cycle` is set)
//!
//! The loop guard is the only place cancellation is observed; a pending
//! `receive` is not interrupted. Whichever way the loop returns, the session
//! is left Closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ExchangeConfig;
use crate::gateway::{DataSourceError, SnapshotSource};
use crate::session::{ConnectError, Frame, ReceiveError, SendError, Session, SessionState};
use crate::status::{StatusEvent, StatusSender};

/// One-shot cancellation flag shared between the client and its loop
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. There is no way to clear it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Cancellation flag was set
    Cancelled,
    /// Peer sent a close frame
    PeerClosed,
    /// Session was no longer open at the loop guard
    SessionEnded,
}

/// Failure of a single cycle
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

/// Outcome of a cycle that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Relayed,
    Ignored,
    PeerClosed,
}

/// Run cycles until cancelled, closed by the peer, or the session ends
pub async fn run<S, G>(
    session: &mut S,
    gateway: &G,
    cancel: &CancelSignal,
    status: &StatusSender,
    config: &ExchangeConfig,
) -> LoopExit
where
    S: Session + ?Sized,
    G: SnapshotSource + ?Sized,
{
    loop {
        if cancel.is_cancelled() {
            tracing::info!("Exchange loop cancelled");
            release(session, status).await;
            return LoopExit::Cancelled;
        }
        if session.state() != SessionState::Open {
            tracing::info!(state = %session.state(), "Exchange loop finished");
            release(session, status).await;
            return LoopExit::SessionEnded;
        }

        match cycle(session, gateway, &config.probe).await {
            Ok(Cycle::PeerClosed) => {
                session.close().await;
                status.emit(StatusEvent::ConnectionClosed);
                return LoopExit::PeerClosed;
            }
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "Cycle complete");
                if config.close_after_cycle {
                    session.close().await;
                    status.emit(StatusEvent::ConnectionClosed);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cycle failed");
                status.error(&e);
                session.close().await;
                status.emit(StatusEvent::ConnectionClosed);
            }
        }
    }
}

/// Close a session the loop is leaving behind, unless it already is
pub(crate) async fn release<S>(session: &mut S, status: &StatusSender)
where
    S: Session + ?Sized,
{
    if session.state() != SessionState::Closed {
        session.close().await;
        status.emit(StatusEvent::ConnectionClosed);
    }
}

async fn cycle<S, G>(session: &mut S, gateway: &G, probe: &str) -> Result<Cycle, CycleError>
where
    S: Session + ?Sized,
    G: SnapshotSource + ?Sized,
{
    session.send(probe).await?;

    match session.receive().await? {
        Frame::Close => Ok(Cycle::PeerClosed),
        Frame::Text(text) => {
            // Content is not interpreted; any text frame triggers the snapshot
            tracing::debug!(bytes = text.len(), "Trigger received");
            let payload = gateway.fetch_snapshot()?;
            session.send(&payload).await?;
            tracing::info!(bytes = payload.len(), "Snapshot relayed");
            Ok(Cycle::Relayed)
        }
        Frame::Binary(data) => {
            tracing::debug!(bytes = data.len(), "Ignoring binary frame");
            Ok(Cycle::Ignored)
        }
    }
}

/// Connect `session` to `address` and run the loop on it
///
/// A connect failure is reported as a single `Error` event and the loop is
/// never entered.
pub async fn connect_and_run<S, G>(
    session: &mut S,
    address: &str,
    gateway: &G,
    cancel: &CancelSignal,
    status: &StatusSender,
    config: &ExchangeConfig,
) -> Result<LoopExit, ConnectError>
where
    S: Session + ?Sized,
    G: SnapshotSource + ?Sized,
{
    if let Err(e) = session.connect(address).await {
        status.error(&e);
        return Err(e);
    }
    status.emit(StatusEvent::Connected);

    Ok(run(session, gateway, cancel, status, config).await)
}
