//! Connection lifecycle: one reconnecting duplex connection to the host.
//!
//! A single task owns the connection. It opens the transport, sends the
//! handshake, hands every inbound frame to the router and, when the
//! connection drops, waits the reconnect interval before trying again. All
//! transport events and timer expiries are processed on that task in
//! arrival order, so application callbacks never run concurrently with each
//! other.

pub mod events;

use crate::error::{Result, SdkError};
use crate::protocol::Envelope;
use crate::protocol::actions::outbound;
use crate::session::Session;
use crate::transport::{Connector, FrameSink, TransportEvent, TransportLink};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub use events::{LifecycleEvent, LifecycleHandler};

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt scheduled.
    Disconnected,
    /// An attempt is in progress.
    Connecting,
    /// The transport is open and the handshake has been sent.
    Connected,
    /// Waiting for the reconnect timer.
    ReconnectWaiting,
}

impl ConnectionState {
    /// Lowercase label for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectWaiting => "reconnect_waiting",
        }
    }
}

/// A component that writes through the current transport.
///
/// The manager pushes the fresh handle after every successful open.
pub trait TransportDependent: Send + Sync {
    /// Replace the transport handle.
    fn update_transport(&self, sink: FrameSink);
}

/// Consumer of inbound text frames.
pub trait FrameHandler: Send + Sync {
    /// Process one frame.
    fn handle_frame(&self, raw: &str);
}

/// Shared slot holding the handle of the open transport, if any.
#[derive(Debug, Clone, Default)]
pub struct TransportCell {
    inner: Arc<Mutex<Option<FrameSink>>>,
}

impl TransportCell {
    /// Handle of the open transport.
    pub fn current(&self) -> Option<FrameSink> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, sink: FrameSink) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn clear(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[derive(Debug)]
enum Control {
    ConnectNow,
    Shutdown,
}

type Dependents = Arc<Mutex<Vec<Weak<dyn TransportDependent>>>>;

/// Owns the connection task and the state shared with it.
pub struct ConnectionManager {
    url: String,
    connector: Arc<dyn Connector>,
    reconnect_interval: Duration,
    session: Arc<Session>,
    transport: TransportCell,
    state_tx: watch::Sender<ConnectionState>,
    dependents: Dependents,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: Mutex<Option<mpsc::UnboundedReceiver<Control>>>,
}

impl ConnectionManager {
    /// Create a manager; nothing happens until [`connect`](Self::connect).
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        reconnect_interval: Duration,
        session: Arc<Session>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            connector,
            reconnect_interval,
            session,
            transport: TransportCell::default(),
            state_tx,
            dependents: Arc::new(Mutex::new(Vec::new())),
            control_tx,
            control_rx: Mutex::new(Some(control_rx)),
        }
    }

    /// Address the manager connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start the connection task on the current tokio runtime.
    ///
    /// Inbound frames go to `router`; lifecycle changes go to `on_event`.
    /// Fails with [`SdkError::AlreadyInitialized`] when called twice.
    pub fn connect(
        &self,
        router: Arc<dyn FrameHandler>,
        on_event: Option<LifecycleHandler>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SdkError::Connection(format!("no tokio runtime: {e}")))?;
        let control = self
            .control_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SdkError::AlreadyInitialized)?;

        let task = ConnectionTask {
            url: self.url.clone(),
            connector: Arc::clone(&self.connector),
            reconnect_interval: self.reconnect_interval,
            session: Arc::clone(&self.session),
            transport: self.transport.clone(),
            state_tx: self.state_tx.clone(),
            dependents: Arc::clone(&self.dependents),
            router,
            on_event,
        };
        runtime.spawn(task.run(control));
        Ok(())
    }

    /// Whether [`connect`](Self::connect) has been called.
    pub fn is_started(&self) -> bool {
        self.control_rx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Handle of the open transport, if any.
    pub fn current_sink(&self) -> Option<FrameSink> {
        self.transport.current()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Register `dependent` for transport updates and hand it the current
    /// transport if one is open.
    ///
    /// Only a weak reference is kept; dropped dependents are pruned on the
    /// next rebind.
    pub fn attach_dependent<D>(&self, dependent: &Arc<D>)
    where
        D: TransportDependent + 'static,
    {
        let weak: Weak<D> = Arc::downgrade(dependent);
        self.dependents.lock().unwrap_or_else(PoisonError::into_inner).push(weak);
        if let Some(sink) = self.transport.current() {
            dependent.update_transport(sink);
        }
    }

    /// Skip the remaining reconnect delay and connect immediately.
    ///
    /// Ignored while a connection attempt is live.
    pub fn reconnect_now(&self) {
        let _ = self.control_tx.send(Control::ConnectNow);
    }

    /// Stop the connection task. The state ends at `Disconnected`.
    pub fn shutdown(&self) {
        let _ = self.control_tx.send(Control::Shutdown);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
    }
}

enum Outcome {
    Closed,
    Shutdown,
}

struct ConnectionTask {
    url: String,
    connector: Arc<dyn Connector>,
    reconnect_interval: Duration,
    session: Arc<Session>,
    transport: TransportCell,
    state_tx: watch::Sender<ConnectionState>,
    dependents: Dependents,
    router: Arc<dyn FrameHandler>,
    on_event: Option<LifecycleHandler>,
}

impl ConnectionTask {
    async fn run(self, mut control: mpsc::UnboundedReceiver<Control>) {
        let mut closed_before = false;

        loop {
            self.set_state(ConnectionState::Connecting);
            info!(url = %self.url, "Connecting to host");
            let TransportLink { sink, mut events } = self.connector.connect(&self.url);
            let mut pending_sink = Some(sink);

            let outcome = loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(TransportEvent::Open) => match pending_sink.take() {
                            Some(sink) => self.on_open(sink, closed_before),
                            None => debug!(url = %self.url, "Ignoring repeated open"),
                        },
                        Some(TransportEvent::Message(text)) => self.router.handle_frame(&text),
                        Some(TransportEvent::Error(reason)) => {
                            warn!(url = %self.url, error = %reason, "Transport error");
                            self.emit(LifecycleEvent::Error(reason));
                        }
                        Some(TransportEvent::Close) | None => break Outcome::Closed,
                    },
                    command = control.recv() => match command {
                        Some(Control::ConnectNow) => {
                            debug!(url = %self.url, "Connection attempt live, ignoring reconnect request");
                        }
                        Some(Control::Shutdown) | None => break Outcome::Shutdown,
                    },
                }
            };

            drop(events);
            drop(pending_sink);
            self.transport.clear();

            if let Outcome::Shutdown = outcome {
                self.set_state(ConnectionState::Disconnected);
                info!(url = %self.url, "Connection shut down");
                return;
            }

            closed_before = true;
            self.set_state(ConnectionState::Disconnected);
            info!(url = %self.url, "Connection closed");
            self.emit(LifecycleEvent::Close);

            self.set_state(ConnectionState::ReconnectWaiting);
            debug!(
                url = %self.url,
                delay_ms = self.reconnect_interval.as_millis() as u64,
                "Reconnect scheduled"
            );
            tokio::select! {
                () = tokio::time::sleep(self.reconnect_interval) => {}
                command = control.recv() => match command {
                    Some(Control::ConnectNow) => debug!(url = %self.url, "Reconnect timer cancelled"),
                    Some(Control::Shutdown) | None => {
                        self.set_state(ConnectionState::Disconnected);
                        info!(url = %self.url, "Connection shut down");
                        return;
                    }
                },
            }
        }
    }

    fn on_open(&self, sink: FrameSink, closed_before: bool) {
        // The handshake is queued before the sink becomes visible to callers.
        let handshake = Envelope::new(outbound::INIT_USER)
            .with_package_name(self.session.package_name())
            .with_data(json!({
                "uuid": self.session.id(),
                "public_data": self.session.public_data(),
            }));
        if let Err(e) = sink.send(&handshake) {
            warn!(url = %self.url, error = %e, "Failed to send handshake");
        }

        self.transport.set(sink.clone());
        self.set_state(ConnectionState::Connected);
        self.rebind_dependents(&sink);

        if closed_before {
            info!(url = %self.url, "Reconnected to host");
            self.emit(LifecycleEvent::Reconnect);
        } else {
            info!(url = %self.url, "Connected to host");
            self.emit(LifecycleEvent::Open);
        }
    }

    fn rebind_dependents(&self, sink: &FrameSink) {
        let live: Vec<Arc<dyn TransportDependent>> = {
            let mut dependents = self.dependents.lock().unwrap_or_else(PoisonError::into_inner);
            dependents.retain(|weak| weak.strong_count() > 0);
            dependents.iter().filter_map(Weak::upgrade).collect()
        };
        for dependent in live {
            dependent.update_transport(sink.clone());
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(handler) = &self.on_event {
            handler(event);
        }
    }
}
