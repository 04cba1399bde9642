//! Relay Client
//!
//! Application context that owns everything the exchange loop shares with
//! the outside: the cancellation signal, the status channel and the handle
//! of the spawned loop task. At most one loop runs at a time.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

use crate::config::{ClientConfig, Config, ExchangeConfig};
use crate::exchange::{self, CancelSignal, LoopExit};
use crate::gateway::{DataSourceError, SnapshotSource, SqliteGateway};
use crate::session::{Session, WsSession};
use crate::status::{self, StatusEvent, StatusReceiver, StatusSender};

/// Errors from the client lifecycle controls
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Exchange loop is already running")]
    AlreadyRunning,

    #[error("Client has been stopped")]
    Stopped,

    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

/// Owns the loop task and its cancellation signal
pub struct RelayClient {
    endpoint: String,
    exchange: ExchangeConfig,
    client: ClientConfig,
    gateway: Arc<dyn SnapshotSource>,
    cancel: CancelSignal,
    status: StatusSender,
    task: Option<LoopTask>,
}

/// Spawned loop plus the channel that tells it to give up a blocked receive
struct LoopTask {
    /// Resolves to `None` when the connect step failed
    handle: JoinHandle<Option<LoopExit>>,
    interrupt: oneshot::Sender<()>,
}

impl RelayClient {
    /// Create a client around an existing gateway and status channel
    pub fn new(config: &Config, gateway: Arc<dyn SnapshotSource>, status: StatusSender) -> Self {
        Self {
            endpoint: config.server.endpoint(),
            exchange: config.exchange.clone(),
            client: config.client.clone(),
            gateway,
            cancel: CancelSignal::new(),
            status,
            task: None,
        }
    }

    /// Build a client backed by the configured SQLite table
    ///
    /// Returns the receiving end of the status channel alongside the client.
    pub fn from_config(config: &Config) -> Result<(Self, StatusReceiver), ClientError> {
        let gateway = SqliteGateway::from_config(&config.data_source)?;
        let (status, rx) = status::channel();
        Ok((Self::new(config, Arc::new(gateway), status), rx))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Spawn connect + exchange loop on a fresh session
    pub fn start(&mut self) -> Result<(), ClientError> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Stopped);
        }
        if self.is_running() {
            return Err(ClientError::AlreadyRunning);
        }

        let endpoint = self.endpoint.clone();
        let exchange = self.exchange.clone();
        let gateway = Arc::clone(&self.gateway);
        let cancel = self.cancel.clone();
        let status = self.status.clone();

        let (interrupt, interrupted) = oneshot::channel();

        tracing::info!(url = %endpoint, "Starting exchange loop");

        let handle = tokio::spawn(async move {
            let mut session = WsSession::new();

            // A dropped sender disables the interrupt branch
            tokio::select! {
                result = exchange::connect_and_run(
                    &mut session,
                    &endpoint,
                    gateway.as_ref(),
                    &cancel,
                    &status,
                    &exchange,
                ) => return result.ok(),
                Ok(()) = interrupted => {}
            }

            tracing::info!(state = %session.state(), "Exchange loop interrupted");
            exchange::release(&mut session, &status).await;
            Some(LoopExit::Cancelled)
        });

        self.task = Some(LoopTask { handle, interrupt });
        Ok(())
    }

    /// Whether a loop task exists and has not finished
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.handle.is_finished())
    }

    /// Wait for the current loop task to end on its own
    ///
    /// Returns `None` when nothing was started or the connect step failed.
    /// Dropping the returned future leaves the task untouched.
    pub async fn wait(&mut self) -> Option<LoopExit> {
        let task = self.task.as_mut()?;
        let joined = (&mut task.handle).await;
        self.task = None;
        loop_exit(joined)
    }

    /// Cancel the loop, close the session and wait for the task to end
    ///
    /// A loop blocked in `receive` does not observe the cancellation flag, so
    /// after the grace period it is interrupted and the session closed from
    /// the task. `Disconnected` is emitted once the task is gone.
    pub async fn stop(&mut self) -> Option<LoopExit> {
        self.cancel.cancel();

        let exit = match self.task.take() {
            Some(task) => self.shutdown(task).await,
            None => None,
        };

        self.status.emit(StatusEvent::Disconnected);
        exit
    }

    async fn shutdown(&self, mut task: LoopTask) -> Option<LoopExit> {
        let grace = Duration::from_millis(self.client.shutdown_grace_ms);

        if let Ok(joined) = tokio::time::timeout(grace, &mut task.handle).await {
            return loop_exit(joined);
        }

        tracing::info!("Exchange loop still blocked, interrupting");
        let _ = task.interrupt.send(());

        match tokio::time::timeout(grace, &mut task.handle).await {
            Ok(joined) => loop_exit(joined),
            Err(_) => {
                tracing::warn!("Session close did not finish, aborting exchange loop");
                task.handle.abort();
                let _ = task.handle.await;
                Some(LoopExit::Cancelled)
            }
        }
    }
}

fn loop_exit(joined: Result<Option<LoopExit>, JoinError>) -> Option<LoopExit> {
    match joined {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!(error = %e, "Exchange loop task failed");
            None
        }
    }
}
