//! Dot-notation flattening for partial update documents.
//!
//! The host applies updates as a list of `path:value` entries, one per leaf,
//! where `path` joins nested keys with `.`:
//!
//! ```text
//! {"profile": {"level": 2, "name": "ada"}}  =>  ["profile.level:2", "profile.name:ada"]
//! ```
//!
//! Arrays are leaves: they are rendered as JSON text and never descended
//! into.

use serde_json::{Map, Value};

/// Flattens `document` into ordered `path:value` entries.
///
/// Entries follow the key order of the document.
pub fn flatten(document: &Map<String, Value>) -> Vec<String> {
    flatten_with_prefix(document, "")
}

/// Flattens `document` with every path rooted at `prefix`.
///
/// An empty prefix yields top-level keys unqualified.
pub fn flatten_with_prefix(document: &Map<String, Value>, prefix: &str) -> Vec<String> {
    let mut entries = Vec::new();
    flatten_into(document, prefix, &mut entries);
    entries
}

fn flatten_into(document: &Map<String, Value>, prefix: &str, entries: &mut Vec<String>) {
    for (key, value) in document {
        let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            Value::Object(nested) => flatten_into(nested, &path, entries),
            leaf => entries.push(format!("{path}:{}", render_leaf(leaf))),
        }
    }
}

fn render_leaf(leaf: &Value) -> String {
    match leaf {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
