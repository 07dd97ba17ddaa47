//! WebSocket transport built on tokio-tungstenite.

use super::{Connector, FrameSink, TransportEvent, TransportLink};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, warn};

/// Connects over plain WebSockets.
///
/// Each attempt runs on its own task, which must be spawned from within a
/// tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, url: &str) -> TransportLink {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url.to_string(), frame_rx, event_tx));
        TransportLink { sink: FrameSink::new(frame_tx), events: event_rx }
    }
}

async fn run_socket(
    url: String,
    mut frames: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    debug!(url = %url, "Connecting to WebSocket");

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _)) => socket,
        Err(e) => {
            warn!(url = %url, error = %e, "WebSocket connect failed");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Close);
            return;
        }
    };

    debug!(url = %url, "WebSocket connected");
    let (mut sink, mut stream) = socket.split();
    if events.send(TransportEvent::Open).is_err() {
        let _ = sink.close().await;
        return;
    }

    loop {
        // Queued frames go out before a close is honoured.
        tokio::select! {
            biased;
            outbound = frames.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        let _ = events.send(TransportEvent::Close);
                        return;
                    }
                }
                // Every write handle is gone; nobody can talk on this socket.
                None => {
                    let _ = sink.close().await;
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        let _ = events.send(TransportEvent::Message(text));
                    }
                    Err(e) => debug!(error = %e, "Dropping non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!(url = %url, "WebSocket closed by peer");
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
                // Ping/pong is answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "WebSocket error");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
            },
            () = events.closed() => {
                debug!(url = %url, "Event receiver dropped, closing WebSocket");
                let _ = sink.close().await;
                return;
            }
        }
    }
}
