//! Dispatch of inbound frames by action.

use crate::connection::{FrameHandler, LifecycleEvent, LifecycleHandler};
use crate::correlator::RequestCorrelator;
use crate::protocol::actions::inbound;
use crate::protocol::{Envelope, SdkRequestKind, STORE_ACTION_PREFIX};
use crate::store::DocumentStoreClient;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

/// Slot holding the client's current document store, if one was created.
pub type StoreSlot = Arc<Mutex<Option<Arc<DocumentStoreClient>>>>;

/// Routes each inbound frame to a request callback, the lifecycle handler
/// or the document store.
pub struct MessageRouter {
    requests: Arc<RequestCorrelator<SdkRequestKind>>,
    on_event: Option<LifecycleHandler>,
    store: StoreSlot,
}

impl MessageRouter {
    /// Create a router resolving results through `requests` and forwarding
    /// store results to whatever `store` holds.
    pub fn new(
        requests: Arc<RequestCorrelator<SdkRequestKind>>,
        on_event: Option<LifecycleHandler>,
        store: StoreSlot,
    ) -> Self {
        Self { requests, on_event, store }
    }

    fn resolve(&self, kind: SdkRequestKind, envelope: &Envelope) {
        let Some(callback) = self.requests.resolve(kind, envelope.request_id) else {
            debug!(action = %envelope.action, "No callback for result");
            return;
        };
        let payload = match kind {
            SdkRequestKind::AllUsers => field(envelope, "all_users"),
            SdkRequestKind::PublicData => field(envelope, "public_data"),
            SdkRequestKind::CreateFile | SdkRequestKind::ReadFile => envelope.to_value(),
        };
        callback(payload);
    }

    fn notify(&self, event: LifecycleEvent) {
        if let Some(handler) = &self.on_event {
            handler(event);
        }
    }

    fn forward_to_store(&self, envelope: &Envelope, action: &str) {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match store {
            Some(store) => store.handle_result(action, envelope.data.as_ref(), envelope.request_id),
            None => debug!(action = %envelope.action, "No document store for result"),
        }
    }
}

fn field(envelope: &Envelope, name: &str) -> Value {
    envelope.field(name).cloned().unwrap_or(Value::Null)
}

impl FrameHandler for MessageRouter {
    fn handle_frame(&self, raw: &str) {
        trace!(frame = %raw, "Inbound frame");
        let envelope = match Envelope::parse(raw) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "Dropping unparseable frame");
                return;
            }
        };

        if let Some(store_action) = envelope.action.strip_prefix(STORE_ACTION_PREFIX) {
            self.forward_to_store(&envelope, store_action);
            return;
        }

        if let Some(kind) = SdkRequestKind::from_result_action(&envelope.action) {
            self.resolve(kind, &envelope);
            return;
        }

        match envelope.action.as_str() {
            inbound::USER_ARRIVE => self.notify(LifecycleEvent::UserArrive(field(&envelope, "user"))),
            inbound::USER_LEFT => self.notify(LifecycleEvent::UserLeft(envelope.to_value())),
            inbound::MSG_ARRIVE => self.notify(LifecycleEvent::MsgArrive(field(&envelope, "message"))),
            other => debug!(action = %other, "Dropping frame with unknown action"),
        }
    }
}
