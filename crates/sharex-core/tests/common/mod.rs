//! Shared test utilities for Sharex Core integration tests.
//!
//! Clients are wired to a [`MemoryConnector`], so each test scripts the host
//! side of the connection through a [`MemoryPeer`].

#![allow(dead_code)]

use serde_json::Value;
use sharex_core::{
    LifecycleEvent, LifecycleHandler, MemoryConnector, MemoryListener, MemoryPeer, MemoryStore,
    ResultCallback, SdkOptions, SharexClient, callback,
};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

/// Upper bound for waits that are expected to succeed.
pub const WAIT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A client wired to an in-memory host.
pub struct Harness {
    pub client: SharexClient,
    pub listener: MemoryListener,
    pub events: mpsc::UnboundedReceiver<LifecycleEvent>,
}

/// Builds and initializes a client for `options`.
///
/// Options without a debug endpoint get `localhost:8080`.
pub fn harness(options: SdkOptions) -> Harness {
    let mut harness = harness_uninitialized(options);
    harness.init();
    harness
}

/// Like [`harness`], but [`Harness::init`] has not been called yet.
pub fn harness_uninitialized(mut options: SdkOptions) -> Harness {
    init_tracing();
    if options.debug.is_none() {
        options.debug = SdkOptions::debug("localhost", 8080).debug;
    }
    let (connector, listener) = MemoryConnector::new();
    let client = SharexClient::with_connector(options, None, &MemoryStore::new(), Arc::new(connector))
        .expect("valid test options");
    let (_, events) = mpsc::unbounded_channel();
    Harness { client, listener, events }
}

impl Harness {
    /// Starts the connection, capturing lifecycle events.
    pub fn init(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: LifecycleHandler = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        self.client.init(Some(handler)).expect("first init succeeds");
        self.events = rx;
    }

    /// Waits for the next connection attempt, opens it and consumes the
    /// handshake frame, which is returned alongside the peer.
    pub async fn accept_open(&mut self) -> (MemoryPeer, Value) {
        let mut peer = timeout(WAIT, self.listener.accept())
            .await
            .expect("connection attempt in time")
            .expect("connector alive");
        peer.open();
        let handshake = timeout(WAIT, peer.next_json())
            .await
            .expect("handshake in time")
            .expect("handshake frame");
        (peer, handshake)
    }

    /// Waits for the next lifecycle event.
    pub async fn next_event(&mut self) -> LifecycleEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("event in time")
            .expect("event channel open")
    }
}

/// A callback that forwards every result into a channel.
pub fn capture() -> (ResultCallback, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cb = callback(move |value| {
        let _ = tx.send(value);
    });
    (cb, rx)
}

/// Waits for the next captured result.
pub async fn next_result(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(WAIT, rx.recv()).await.expect("result in time").expect("callback alive")
}

/// Waits for the next frame written by the client, parsed as JSON.
pub async fn next_frame(peer: &mut MemoryPeer) -> Value {
    timeout(WAIT, peer.next_json()).await.expect("frame in time").expect("frame")
}
