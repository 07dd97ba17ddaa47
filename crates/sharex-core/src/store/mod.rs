//! Client for the host's JSON document store.
//!
//! Each [`DocumentStoreClient`] addresses one named database. Operations
//! validate their arguments, register the callback for their request kind
//! and write one envelope; results come back through
//! [`handle_result`](DocumentStoreClient::handle_result) once the router has
//! stripped the `db_action_` prefix.

pub mod query;
pub mod result;

use crate::codec::flatten;
use crate::connection::TransportDependent;
use crate::correlator::{CorrelationMode, RequestCorrelator, ResultCallback};
use crate::error::{Result, SdkError, ValidationError};
use crate::protocol::actions::{outbound, store_results};
use crate::protocol::{Envelope, StoreRequestKind};
use crate::transport::FrameSink;
use query::{InsertPayload, classify_insert, require_filter_id, require_non_empty};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

pub use query::{InsertOptions, identity_filter};
pub use result::{decode_filtered, decode_once};

/// Receives store notifications that are not request results
/// (`init_db_result`), with the action name and its raw payload.
pub type StoreEventHandler = Arc<dyn Fn(&str, Value) + Send + Sync>;

/// Remote document database bound to the current connection.
pub struct DocumentStoreClient {
    db_name: String,
    transport: Mutex<Option<FrameSink>>,
    requests: RequestCorrelator<StoreRequestKind>,
    on_event: Option<StoreEventHandler>,
    init_sent: AtomicBool,
}

impl fmt::Debug for DocumentStoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStoreClient")
            .field("db_name", &self.db_name)
            .field("requests", &self.requests)
            .field("init_sent", &self.init_sent.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DocumentStoreClient {
    /// Create a client for `db_name`.
    ///
    /// Nothing is sent until a transport is supplied through
    /// [`TransportDependent::update_transport`].
    pub fn new(
        db_name: impl Into<String>,
        mode: CorrelationMode,
        on_event: Option<StoreEventHandler>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            transport: Mutex::new(None),
            requests: RequestCorrelator::new(mode),
            on_event,
            init_sent: AtomicBool::new(false),
        }
    }

    /// Name of the database.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Insert one document, or every document of an array.
    pub fn insert(&self, collection: &str, data: Value, callback: ResultCallback) -> Result<()> {
        self.insert_with(collection, data, InsertOptions::default(), Some(callback))
    }

    /// Insert with options; a missing callback clears the pending one.
    pub fn insert_with(
        &self,
        collection: &str,
        mut data: Value,
        options: InsertOptions,
        callback: Option<ResultCallback>,
    ) -> Result<()> {
        let collection = require_non_empty("collection", collection)?;
        let payload = classify_insert(&data)?;

        if options.identity {
            stamp_identity(&mut data);
        }
        let action = match payload {
            InsertPayload::Single => outbound::DB_INSERT,
            InsertPayload::Bulk => outbound::DB_INSERT_BULK,
        };

        let request_id = self.requests.replace(StoreRequestKind::Insert, callback);
        let mut body = self.request_body(collection);
        body.insert("new_data".to_string(), data);
        self.send(Envelope::new(action).with_data(Value::Object(body)).with_request_id(request_id))
    }

    /// Fetch documents; without a query the whole collection is returned.
    ///
    /// A query, even an empty one, is passed to the host verbatim.
    pub fn find(
        &self,
        collection: &str,
        query: Option<&str>,
        callback: ResultCallback,
    ) -> Result<()> {
        let collection = require_non_empty("collection", collection)?;
        let request_id = self.requests.register(StoreRequestKind::Find, callback);

        let mut body = self.request_body(collection);
        let action = match query {
            Some(query) => {
                body.insert("query".to_string(), Value::String(query.to_string()));
                outbound::DB_GET
            }
            None => outbound::DB_GET_ALL,
        };
        self.send(Envelope::new(action).with_data(Value::Object(body)).with_request_id(request_id))
    }

    /// Apply a partial update to every document matching `query`.
    ///
    /// The document is sent as dot-notation `path:value` entries.
    pub fn update(
        &self,
        collection: &str,
        query: &str,
        document: &Value,
        callback: ResultCallback,
    ) -> Result<()> {
        let collection = require_non_empty("collection", collection)?;
        let document = document.as_object().ok_or(ValidationError::NotAnObject("document"))?;
        let update = flatten(document);

        let request_id = self.requests.register(StoreRequestKind::Update, callback);
        let mut body = self.request_body(collection);
        body.insert("query".to_string(), Value::String(query.to_string()));
        body.insert("update".to_string(), json!(update));
        self.send(
            Envelope::new(outbound::DB_UPDATE)
                .with_data(Value::Object(body))
                .with_request_id(request_id),
        )
    }

    /// Update the document whose `_uuid` is `id`.
    ///
    /// Ids containing `'` are rejected.
    pub fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
        callback: ResultCallback,
    ) -> Result<()> {
        let id = require_filter_id(id)?;
        self.update(collection, &identity_filter(id), document, callback)
    }

    /// Delete every document matching `query`.
    pub fn delete(&self, collection: &str, query: &str, callback: ResultCallback) -> Result<()> {
        let collection = require_non_empty("collection", collection)?;

        let request_id = self.requests.register(StoreRequestKind::Delete, callback);
        let mut body = self.request_body(collection);
        body.insert("query".to_string(), Value::String(query.to_string()));
        self.send(
            Envelope::new(outbound::DB_DELETE)
                .with_data(Value::Object(body))
                .with_request_id(request_id),
        )
    }

    /// Delete the document whose `_uuid` is `id`.
    pub fn delete_by_id(&self, collection: &str, id: &str, callback: ResultCallback) -> Result<()> {
        let id = require_filter_id(id)?;
        self.delete(collection, &identity_filter(id), callback)
    }

    /// Process a store result. `action` has the `db_action_` prefix removed.
    pub fn handle_result(&self, action: &str, data: Option<&Value>, request_id: Option<u64>) {
        if action == store_results::INIT_DB {
            debug!(db_name = %self.db_name, "Database initialized");
            if let Some(handler) = &self.on_event {
                handler(action, data.cloned().unwrap_or(Value::Null));
            }
            return;
        }

        let Some(kind) = StoreRequestKind::from_result_action(action) else {
            debug!(db_name = %self.db_name, action = %action, "Dropping unknown store result");
            return;
        };
        let Some(callback) = self.requests.resolve(kind, request_id) else {
            debug!(db_name = %self.db_name, action = %action, "No callback for store result");
            return;
        };

        let payload = data.unwrap_or(&Value::Null);
        let decoded = if action == store_results::GET_DATA {
            decode_filtered(payload)
        } else {
            decode_once(payload)
        };
        match decoded {
            Ok(value) => callback(value),
            Err(e) => {
                warn!(db_name = %self.db_name, action = %action, error = %e, "Dropping undecodable store result");
            }
        }
    }

    fn request_body(&self, collection: &str) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("db_name".to_string(), Value::String(self.db_name.clone()));
        body.insert("collection".to_string(), Value::String(collection.to_string()));
        body
    }

    fn current_transport(&self) -> Option<FrameSink> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        let Some(sink) = self.current_transport() else {
            warn!(db_name = %self.db_name, action = %envelope.action, "No open transport, dropping request");
            return Ok(());
        };
        match sink.send(&envelope) {
            Err(SdkError::Connection(reason)) => {
                warn!(db_name = %self.db_name, action = %envelope.action, %reason, "Transport closed, dropping request");
                Ok(())
            }
            other => other,
        }
    }
}

impl TransportDependent for DocumentStoreClient {
    fn update_transport(&self, sink: FrameSink) {
        *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink.clone());

        if self.init_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        let init = Envelope::new(outbound::DB_INIT).with_data(json!({ "db_name": self.db_name }));
        if let Err(e) = sink.send(&init) {
            warn!(db_name = %self.db_name, error = %e, "Failed to send database init");
            self.init_sent.store(false, Ordering::SeqCst);
        }
    }
}

fn stamp_identity(data: &mut Value) {
    match data {
        Value::Array(items) => {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                item.insert("_uuid".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        Value::Object(item) => {
            item.insert("_uuid".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::callback;
    use tokio::sync::mpsc;

    fn bound_store(mode: CorrelationMode) -> (DocumentStoreClient, mpsc::UnboundedReceiver<String>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let store = DocumentStoreClient::new("game", mode, None);
        store.update_transport(FrameSink::new(tx));
        let init: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(init, json!({"action": "db_action_init_db", "data": {"db_name": "game"}}));
        (store, rx)
    }

    fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_init_sent_once_per_instance() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        store.update_transport(FrameSink::new(tx2));
        assert!(rx.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_single_insert_without_identity() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        store.insert("players", json!({"name": "ada"}), callback(|_| {})).unwrap();
        assert_eq!(
            next(&mut rx),
            json!({
                "action": "db_action_insert_data",
                "data": {"db_name": "game", "collection": "players", "new_data": {"name": "ada"}}
            })
        );
    }

    #[test]
    fn test_single_insert_with_identity() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        store
            .insert_with("players", json!({"name": "ada"}), InsertOptions::with_identity(), None)
            .unwrap();
        let frame = next(&mut rx);
        let new_data = &frame["data"]["new_data"];
        assert_eq!(new_data["name"], json!("ada"));
        assert!(crate::session::SessionIdentity::is_valid(new_data["_uuid"].as_str().unwrap()));
    }

    #[test]
    fn test_validation_fails_before_any_write() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        assert!(matches!(
            store.insert("", json!({}), callback(|_| {})),
            Err(SdkError::Validation(ValidationError::EmptyString("collection")))
        ));
        assert!(matches!(
            store.insert("players", json!([1]), callback(|_| {})),
            Err(SdkError::Validation(ValidationError::NotArrayOfObjects))
        ));
        assert!(matches!(
            store.update("players", "$", &json!([1]), callback(|_| {})),
            Err(SdkError::Validation(ValidationError::NotAnObject("document")))
        ));
        assert!(matches!(
            store.delete_by_id("players", "", callback(|_| {})),
            Err(SdkError::Validation(ValidationError::EmptyString("id")))
        ));
        assert!(rx.try_recv().is_err());
        assert!(!store.requests.is_registered(StoreRequestKind::Insert));
        assert!(!store.requests.is_registered(StoreRequestKind::Update));
    }

    #[test]
    fn test_find_without_query_fetches_all() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        store.find("players", None, callback(|_| {})).unwrap();
        assert_eq!(
            next(&mut rx),
            json!({
                "action": "db_action_get_all_data",
                "data": {"db_name": "game", "collection": "players"}
            })
        );
    }

    #[test]
    fn test_find_with_empty_query_is_filtered() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        store.find("players", Some(""), callback(|_| {})).unwrap();
        assert_eq!(
            next(&mut rx),
            json!({
                "action": "db_action_get_data",
                "data": {"db_name": "game", "collection": "players", "query": ""}
            })
        );
    }

    #[test]
    fn test_delete_by_id_frame() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        store.delete_by_id("players", "abc-123", callback(|_| {})).unwrap();
        assert_eq!(
            next(&mut rx),
            json!({
                "action": "db_action_delete_data",
                "data": {
                    "db_name": "game",
                    "collection": "players",
                    "query": "$[?(@._uuid == 'abc-123')]"
                }
            })
        );
    }

    #[test]
    fn test_quoted_ids_are_rejected_before_any_write() {
        let (store, mut rx) = bound_store(CorrelationMode::Legacy);
        assert!(matches!(
            store.update_by_id("players", "a'b", &json!({"x": 1}), callback(|_| {})),
            Err(SdkError::Validation(ValidationError::UnquotableId("id")))
        ));
        assert!(matches!(
            store.delete_by_id("players", "') || true || ('", callback(|_| {})),
            Err(SdkError::Validation(ValidationError::UnquotableId("id")))
        ));
        assert!(rx.try_recv().is_err());
        assert!(!store.requests.is_registered(StoreRequestKind::Update));
        assert!(!store.requests.is_registered(StoreRequestKind::Delete));
    }

    #[test]
    fn test_request_without_transport_is_dropped() {
        let store = DocumentStoreClient::new("game", CorrelationMode::Legacy, None);
        store.find("players", None, callback(|_| {})).unwrap();
        assert!(store.requests.is_registered(StoreRequestKind::Find));
    }

    #[test]
    fn test_undecodable_result_is_dropped() {
        let (store, _rx) = bound_store(CorrelationMode::Legacy);
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        store.delete("players", "$", callback(move |v| sink.lock().unwrap().push(v))).unwrap();

        store.handle_result("delete_data_result", Some(&json!("{oops")), None);
        store.handle_result("delete_data_result", Some(&json!(r#"{"deleted":1}"#)), None);
        assert_eq!(*hits.lock().unwrap(), vec![json!({"deleted": 1})]);
    }

    #[test]
    fn test_init_result_goes_to_event_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: StoreEventHandler =
            Arc::new(move |action, data| sink.lock().unwrap().push((action.to_string(), data)));
        let store = DocumentStoreClient::new("game", CorrelationMode::Legacy, Some(handler));

        store.handle_result("init_db_result", Some(&json!("ready")), None);
        assert_eq!(*seen.lock().unwrap(), vec![("init_db_result".to_string(), json!("ready"))]);
    }

    #[test]
    fn test_correlated_requests_carry_ids() {
        let (store, mut rx) = bound_store(CorrelationMode::Correlated);
        store.find("players", None, callback(|_| {})).unwrap();
        store.find("players", Some("$[0]"), callback(|_| {})).unwrap();
        assert_eq!(next(&mut rx)["request_id"], json!(1));
        assert_eq!(next(&mut rx)["request_id"], json!(2));
    }
}
