//! Decoding of store result payloads.
//!
//! The host sends result payloads as JSON text inside the envelope's `data`
//! field. Filtered fetches are encoded twice: the outer text decodes to
//! `{status, data}` whose `data` is itself JSON text.

use serde_json::{Map, Value};

/// Decode one layer of JSON text.
///
/// A payload that is already structured is returned unchanged.
pub fn decode_once(payload: &Value) -> serde_json::Result<Value> {
    match payload {
        Value::String(text) => serde_json::from_str(text),
        other => Ok(other.clone()),
    }
}

/// Decode a filtered fetch result into `{status, data}`.
pub fn decode_filtered(payload: &Value) -> serde_json::Result<Value> {
    let outer = decode_once(payload)?;
    let status = outer.get("status").cloned().unwrap_or(Value::Null);
    let inner = match outer.get("data") {
        Some(data) => decode_once(data)?,
        None => Value::Null,
    };

    let mut result = Map::new();
    result.insert("status".to_string(), status);
    result.insert("data".to_string(), inner);
    Ok(Value::Object(result))
}
