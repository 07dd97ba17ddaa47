//! Argument checks and filter construction for store operations.

use crate::error::ValidationError;
use serde_json::Value;

/// Filter expression selecting the document whose `_uuid` equals `id`.
pub fn identity_filter(id: &str) -> String {
    format!("$[?(@._uuid == '{id}')]")
}

/// Checks that `id` can be embedded in an [`identity_filter`].
pub(crate) fn require_filter_id(id: &str) -> Result<&str, ValidationError> {
    let id = require_non_empty("id", id)?;
    if id.contains('\'') { Err(ValidationError::UnquotableId("id")) } else { Ok(id) }
}

/// Options for [`insert_with`](super::DocumentStoreClient::insert_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Stamp a fresh `_uuid` onto every inserted document.
    pub identity: bool,
}

impl InsertOptions {
    /// Options that stamp identities.
    pub fn with_identity() -> Self {
        Self { identity: true }
    }

    /// Read options from an untyped value.
    ///
    /// `null` means defaults. `identity` (or its older spelling `uuid`)
    /// must be a boolean when present.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let options = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(options) => options,
            _ => return Err(ValidationError::InvalidOptions),
        };
        match options.get("identity").or_else(|| options.get("uuid")) {
            None => Ok(Self::default()),
            Some(Value::Bool(identity)) => Ok(Self { identity: *identity }),
            Some(_) => Err(ValidationError::IdentityNotBoolean),
        }
    }
}

pub(crate) fn require_non_empty<'a>(
    name: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    if value.is_empty() { Err(ValidationError::EmptyString(name)) } else { Ok(value) }
}

/// Shape of an insert payload.
pub(crate) enum InsertPayload {
    Single,
    Bulk,
}

pub(crate) fn classify_insert(data: &Value) -> Result<InsertPayload, ValidationError> {
    match data {
        Value::Object(_) => Ok(InsertPayload::Single),
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(InsertPayload::Bulk),
        Value::Array(_) => Err(ValidationError::NotArrayOfObjects),
        _ => Err(ValidationError::NotObjectOrArray("data")),
    }
}
