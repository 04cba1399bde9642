//! # Snapshot Relay
//!
//! Background WebSocket client that keeps a connection to a remote server,
//! probes it with liveness messages, and answers every text frame it receives
//! with a JSON snapshot of a relational table.
//!
//! ## Modules
//!
//! - [`gateway`]: Full-table SQLite reads serialized as JSON
//! - [`session`]: WebSocket connection lifecycle
//! - [`exchange`]: The ping → receive → relay loop
//! - [`client`]: Start/stop controls and the loop task
//! - [`status`]: Notifications for the outer layer
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapshot_relay::{Config, RelayClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let (mut client, mut status) = RelayClient::from_config(&config)?;
//!
//!     client.start()?;
//!     while let Some(event) = status.recv().await {
//!         println!("{}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod exchange;
pub mod gateway;
pub mod session;
pub mod status;

#[cfg(test)]
mod test_support;

// Re-export top-level types for convenience
pub use client::{ClientError, RelayClient};

pub use config::{
    ClientConfig, Config, ConfigError, DataSourceConfig, ExchangeConfig, LoggingConfig,
    ServerConfig,
};

pub use exchange::{CancelSignal, CycleError, LoopExit};

pub use gateway::{
    DataSourceError, DataSourceResult, Payload, Row, SnapshotSource, SqliteGateway, TableSnapshot,
};

pub use session::{
    ConnectError, Frame, ReceiveError, SendError, Session, SessionState, WsSession,
};

pub use status::{StatusEvent, StatusReceiver, StatusSender};
