//! Application-facing client.

use crate::config::{ConnectionTarget, HostLocation, SdkOptions};
use crate::connection::{ConnectionManager, ConnectionState, LifecycleHandler};
use crate::correlator::{RequestCorrelator, ResultCallback};
use crate::error::{Result, SdkError, ValidationError};
use crate::protocol::actions::outbound;
use crate::protocol::{Envelope, SdkRequestKind};
use crate::router::{MessageRouter, StoreSlot};
use crate::session::{KeyValueStore, Session, SessionIdentity};
use crate::store::query::require_non_empty;
use crate::store::{DocumentStoreClient, StoreEventHandler};
use crate::transport::{Connector, WebSocketConnector};
use serde_json::{Map, Value, json};
use std::sync::{Arc, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Connection to a Sharex host on behalf of one plugin page.
///
/// Construction resolves the address and the session but does not touch the
/// network; [`init`](Self::init) starts the connection. Dropping the client
/// stops it.
pub struct SharexClient {
    target: ConnectionTarget,
    session: Arc<Session>,
    manager: ConnectionManager,
    requests: Arc<RequestCorrelator<SdkRequestKind>>,
    store: StoreSlot,
    options: SdkOptions,
}

impl SharexClient {
    /// Create a client that connects over WebSockets.
    ///
    /// `location` is the page address; it may be omitted when `options`
    /// names a debug endpoint. `storage` is consulted for a preserved
    /// session id when `preserve_session_id` is set.
    pub fn new(
        options: SdkOptions,
        location: Option<&HostLocation>,
        storage: &dyn KeyValueStore,
    ) -> Result<Self> {
        Self::with_connector(options, location, storage, Arc::new(WebSocketConnector::new()))
    }

    /// Create a client that opens connections through `connector`.
    pub fn with_connector(
        options: SdkOptions,
        location: Option<&HostLocation>,
        storage: &dyn KeyValueStore,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let target = options.resolve_target(location)?;
        let id = SessionIdentity::resolve(options.preserve_session_id, storage);
        let session = Arc::new(Session::new(
            id,
            target.package_name.clone(),
            options.public_data.clone(),
        ));
        let manager = ConnectionManager::new(
            target.url(),
            connector,
            options.reconnect_interval(),
            Arc::clone(&session),
        );
        debug!(url = %target.url(), package_name = %target.package_name, "Client created");

        Ok(Self {
            target,
            session,
            manager,
            requests: Arc::new(RequestCorrelator::new(options.correlation)),
            store: StoreSlot::default(),
            options,
        })
    }

    /// Start connecting. `on_event` receives lifecycle changes and host
    /// notifications on the connection task.
    pub fn init(&self, on_event: Option<LifecycleHandler>) -> Result<()> {
        let router = MessageRouter::new(
            Arc::clone(&self.requests),
            on_event.clone(),
            Arc::clone(&self.store),
        );
        self.manager.connect(Arc::new(router), on_event)
    }

    /// Create the document store client for `db_name`.
    ///
    /// It replaces any store created earlier as the receiver of store
    /// results, and follows the connection across reconnects.
    pub fn create_db_instance(
        &self,
        db_name: &str,
        on_event: Option<StoreEventHandler>,
    ) -> Result<Arc<DocumentStoreClient>> {
        let db_name = require_non_empty("db_name", db_name)?;
        let store = Arc::new(DocumentStoreClient::new(db_name, self.options.correlation, on_event));
        self.manager.attach_dependent(&store);
        *self.store.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Send a direct message to the user `uuid`.
    pub fn send_msg(&self, uuid: &str, msg: Value) -> Result<()> {
        self.ensure_initialized()?;
        let uuid = require_non_empty("uuid", uuid)?;
        self.send(Envelope::new(outbound::SEND_MSG).with_data(json!({"uuid": uuid, "msg": msg})))
    }

    /// Ask for every connected user; `callback` receives the user list.
    pub fn get_all_users(&self, callback: ResultCallback) -> Result<()> {
        self.ensure_initialized()?;
        self.request(SdkRequestKind::AllUsers, None, callback)
    }

    /// Ask for the public data of user `uuid`.
    pub fn request_public_data(&self, uuid: &str, callback: ResultCallback) -> Result<()> {
        self.ensure_initialized()?;
        let uuid = require_non_empty("uuid", uuid)?;
        self.request(SdkRequestKind::PublicData, Some(json!({"uuid": uuid})), callback)
    }

    /// Replace this client's public data and announce it.
    ///
    /// The new data is also used by every later handshake.
    pub fn update_my_public_data(&self, data: Value) -> Result<()> {
        let Value::Object(data) = data else {
            return Err(ValidationError::NotAnObject("public_data").into());
        };
        self.session.replace_public_data(data.clone());
        if !self.manager.is_started() {
            return Ok(());
        }
        self.send(
            Envelope::new(outbound::UPDATE_USER_DATA).with_data(json!({"public_data": data})),
        )
    }

    /// Write `data` to a JSON file on the host.
    pub fn create_json_file(
        &self,
        filename: &str,
        data: Value,
        callback: ResultCallback,
    ) -> Result<()> {
        self.ensure_initialized()?;
        let filename = require_non_empty("filename", filename)?;
        if !(data.is_object() || data.is_array()) {
            return Err(ValidationError::NotObjectOrArray("data").into());
        }
        self.request(
            SdkRequestKind::CreateFile,
            Some(json!({"filename": filename, "data": data})),
            callback,
        )
    }

    /// Read a JSON file from the host.
    pub fn read_json_file(&self, filename: &str, callback: ResultCallback) -> Result<()> {
        self.ensure_initialized()?;
        let filename = require_non_empty("filename", filename)?;
        self.request(SdkRequestKind::ReadFile, Some(json!({"filename": filename})), callback)
    }

    /// This client's session identifier.
    pub fn my_uuid(&self) -> &str {
        self.session.id()
    }

    /// This client's current public data.
    pub fn my_public_data(&self) -> Map<String, Value> {
        self.session.public_data()
    }

    /// Package name announced in the handshake.
    pub fn package_name(&self) -> &str {
        self.session.package_name()
    }

    /// Whether the connection is open.
    pub fn connection_status(&self) -> bool {
        self.manager.state() == ConnectionState::Connected
    }

    /// Current lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Watch lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.manager.subscribe_state()
    }

    /// WebSocket URL of the host.
    pub fn url(&self) -> String {
        self.target.url()
    }

    /// Skip the remaining reconnect delay.
    pub fn reconnect_now(&self) {
        self.manager.reconnect_now();
    }

    /// Stop the connection for good.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.manager.is_started() { Ok(()) } else { Err(SdkError::NotInitialized) }
    }

    fn request(
        &self,
        kind: SdkRequestKind,
        data: Option<Value>,
        callback: ResultCallback,
    ) -> Result<()> {
        let request_id = self.requests.register(kind, callback);
        let mut envelope = Envelope::new(kind.request_action()).with_request_id(request_id);
        envelope.data = data;
        self.send(envelope)
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        let Some(sink) = self.manager.current_sink() else {
            warn!(action = %envelope.action, "No open transport, dropping request");
            return Ok(());
        };
        match sink.send(&envelope) {
            Err(SdkError::Connection(reason)) => {
                warn!(action = %envelope.action, %reason, "Transport closed, dropping request");
                Ok(())
            }
            other => other,
        }
    }
}
