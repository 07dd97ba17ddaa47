//! Wire protocol: the envelope exchanged with the host and the action names.

pub mod actions;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use actions::{SdkRequestKind, StoreRequestKind, STORE_ACTION_PREFIX};

/// One message on the connection, in either direction.
///
/// Outbound requests put their arguments in `data`. Host frames also carry
/// payload fields at the top level (`all_users`, `user`, `message`,
/// `public_data`); those land in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Action tag selecting the handler on the receiving side.
    pub action: String,
    /// Request arguments or result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Package the client belongs to (handshake only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Correlation id, present only in correlated mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope carrying only an action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: None,
            package_name: None,
            request_id: None,
            fields: Map::new(),
        }
    }

    /// Attach a `data` payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the package name.
    #[must_use]
    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    /// Attach a correlation id, if any.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<u64>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Look up a top-level payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The envelope as a JSON object, including every top-level field.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse an inbound text frame.
    ///
    /// Returns `Ok(None)` for frames that carry nothing to process: empty
    /// payloads and envelopes with an empty action.
    pub fn parse(raw: &str) -> serde_json::Result<Option<Self>> {
        if raw.is_empty() {
            return Ok(None);
        }
        let envelope: Self = serde_json::from_str(raw)?;
        if envelope.action.is_empty() {
            return Ok(None);
        }
        Ok(Some(envelope))
    }
}
