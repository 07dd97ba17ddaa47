//! In-process transport with a scriptable far end.
//!
//! Every [`Connector::connect`] call on a [`MemoryConnector`] shows up as a
//! [`MemoryPeer`] on the paired [`MemoryListener`]. The peer decides when the
//! connection opens, what arrives and when it closes, and it sees every
//! outbound frame. Nothing happens until the peer acts.

use super::{Connector, FrameSink, TransportEvent, TransportLink};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Connector whose connections are driven by a [`MemoryListener`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives one [`MemoryPeer`] per connection attempt.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    /// Create a connector and the listener that accepts its attempts.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { peers: tx }, MemoryListener { peers: rx })
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, url: &str) -> TransportLink {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer { url: url.to_string(), events: event_tx, frames: frame_rx };

        if let Err(mpsc::error::SendError(peer)) = self.peers.send(peer) {
            debug!(url = %url, "No listener for in-memory connection");
            peer.error("connection refused");
            peer.close();
        }
        TransportLink { sink: FrameSink::new(frame_tx), events: event_rx }
    }
}

impl MemoryListener {
    /// Wait for the next connection attempt.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Take a connection attempt that is already pending.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

/// Far end of one in-memory connection.
///
/// Dropping the peer ends the event stream, which the client sees as a
/// close.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    frames: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// URL the client asked for.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Report the connection as established.
    pub fn open(&self) {
        self.emit(TransportEvent::Open);
    }

    /// Deliver a text frame to the client.
    pub fn deliver(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    /// Deliver a JSON value as a text frame.
    pub fn deliver_json(&self, value: &Value) {
        self.deliver(value.to_string());
    }

    /// Report a transport failure.
    pub fn error(&self, reason: impl Into<String>) {
        self.emit(TransportEvent::Error(reason.into()));
    }

    /// Report the connection as closed.
    pub fn close(&self) {
        self.emit(TransportEvent::Close);
    }

    /// Wait for the next frame written by the client.
    ///
    /// Returns `None` once the client has dropped every write handle.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Wait for the next frame and parse it as JSON.
    pub async fn next_json(&mut self) -> Option<Value> {
        let frame = self.next_frame().await?;
        serde_json::from_str(&frame).ok()
    }

    /// Take a frame that has already been written, if any.
    pub fn try_next_frame(&mut self) -> Option<String> {
        self.frames.try_recv().ok()
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!(url = %self.url, "In-memory connection already released");
        }
    }
}
