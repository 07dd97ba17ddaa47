//! Duplex text-frame transports.
//!
//! A [`Connector`] opens one connection attempt and hands back a
//! [`TransportLink`]: a [`FrameSink`] for outbound frames and a stream of
//! [`TransportEvent`]s. The connection manager consumes the events on a
//! single task, so every transport behaves the same to the layers above.

pub mod memory;
pub mod websocket;

use crate::error::SdkError;
use crate::protocol::Envelope;
use tokio::sync::mpsc;
use tracing::trace;

pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use websocket::WebSocketConnector;

/// Something that happened on a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The transport reported a failure.
    Error(String),
    /// The connection is gone.
    Close,
}

/// Write handle for one connection.
///
/// Cloning is cheap; all clones feed the same connection. Sends never block.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::UnboundedSender<String>,
}

impl FrameSink {
    /// Wrap the sending half of a frame channel.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Queue a raw text frame.
    pub fn send_frame(&self, frame: String) -> Result<(), SdkError> {
        trace!(frame = %frame, "Outbound frame");
        self.tx
            .send(frame)
            .map_err(|_| SdkError::Connection("transport is closed".to_string()))
    }

    /// Serialize and queue an envelope.
    pub fn send(&self, envelope: &Envelope) -> Result<(), SdkError> {
        self.send_frame(envelope.to_frame()?)
    }

    /// Whether the connection behind this handle has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Both halves of a connection attempt.
#[derive(Debug)]
pub struct TransportLink {
    /// Outbound frames.
    pub sink: FrameSink,
    /// Inbound events, ending after [`TransportEvent::Close`].
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections to a URL.
pub trait Connector: Send + Sync {
    /// Start one connection attempt.
    ///
    /// Failures are reported through the event stream rather than returned.
    fn connect(&self, url: &str) -> TransportLink;
}
