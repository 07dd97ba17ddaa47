//! Sharex Core - client SDK for plugin pages hosted by a Sharex host.
//!
//! This crate provides:
//! - One reconnecting duplex connection with a session handshake
//! - Presence, direct messaging and JSON file requests
//! - A client for the host's JSON document store
//! - Configuration, session persistence and error handling
//!
//! # Example
//!
//! ```rust,no_run
//! use sharex_core::{SdkOptions, SharexClient, MemoryStore, callback};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sharex_core::error::Result<()> {
//!     let client = SharexClient::new(SdkOptions::debug("localhost", 8080), None, &MemoryStore::new())?;
//!     client.init(Some(Arc::new(|event| println!("{}", event.tag()))))?;
//!
//!     let store = client.create_db_instance("game", None)?;
//!     store.find("players", None, callback(|players| println!("{players}")))?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod protocol;
pub mod router;
pub mod session;
pub mod store;
pub mod transport;

pub use client::SharexClient;
pub use codec::{flatten, flatten_with_prefix};
pub use config::{ConnectionTarget, DebugEndpoint, HostLocation, SdkOptions};
pub use connection::{
    ConnectionManager, ConnectionState, LifecycleEvent, LifecycleHandler, TransportDependent,
};
pub use correlator::{CorrelationMode, RequestCorrelator, ResultCallback, callback};
pub use error::{ConfigError, Result, SdkError, ValidationError};
pub use protocol::Envelope;
pub use router::MessageRouter;
pub use session::{FileStore, KeyValueStore, MemoryStore, Session, SessionIdentity};
pub use store::{DocumentStoreClient, InsertOptions, StoreEventHandler, identity_filter};
pub use transport::{
    Connector, FrameSink, MemoryConnector, MemoryListener, MemoryPeer, TransportEvent,
    TransportLink, WebSocketConnector,
};
