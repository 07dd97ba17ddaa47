//! Session identity and the per-client session record.

pub mod storage;

use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::{Uuid, Variant};

pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Storage key under which a preserved identifier is kept.
pub const SESSION_STORAGE_KEY: &str = "sharex_sdk_uuid";

/// Produces and restores session identifiers.
pub struct SessionIdentity;

impl SessionIdentity {
    /// A fresh random (v4) identifier.
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }

    /// Whether `candidate` is a canonical hyphenated UUID.
    ///
    /// Accepts RFC 4122 layouts of versions 1 through 8 plus the nil and max
    /// UUIDs, in either letter case.
    pub fn is_valid(candidate: &str) -> bool {
        if candidate.len() != 36 {
            return false;
        }
        let Ok(uuid) = Uuid::try_parse(candidate) else {
            return false;
        };
        if uuid.is_nil() || uuid == Uuid::from_u128(u128::MAX) {
            return true;
        }
        uuid.get_variant() == Variant::RFC4122 && (1..=8).contains(&uuid.get_version_num())
    }

    /// Resolve the identifier for a new session.
    ///
    /// Without `persist` a fresh identifier is generated every time. With
    /// `persist`, a valid identifier found in `storage` is reused; anything
    /// else is replaced by a freshly generated one. Write failures are
    /// logged and do not prevent the new identifier from being used.
    pub fn resolve(persist: bool, storage: &dyn KeyValueStore) -> String {
        if !persist {
            return Self::generate();
        }

        if let Some(stored) = storage.get(SESSION_STORAGE_KEY) {
            if Self::is_valid(&stored) {
                debug!(session_id = %stored, "Reusing preserved session id");
                return stored;
            }
            debug!(stored = %stored, "Discarding invalid preserved session id");
        }

        let fresh = Self::generate();
        if let Err(e) = storage.set(SESSION_STORAGE_KEY, &fresh) {
            warn!(error = %e, "Failed to persist session id");
        }
        fresh
    }
}

/// The identity this client presents to the host.
///
/// The identifier and package name are fixed at construction; public data
/// can be replaced wholesale.
#[derive(Debug)]
pub struct Session {
    id: String,
    package_name: String,
    public_data: Mutex<Map<String, Value>>,
}

impl Session {
    /// Create a session record.
    pub fn new(
        id: impl Into<String>,
        package_name: impl Into<String>,
        public_data: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            package_name: package_name.into(),
            public_data: Mutex::new(public_data),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Package the session belongs to.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Snapshot of the current public data.
    pub fn public_data(&self) -> Map<String, Value> {
        self.public_data.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the public data.
    pub fn replace_public_data(&self, data: Map<String, Value>) {
        *self.public_data.lock().unwrap_or_else(PoisonError::into_inner) = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_is_valid_and_unique() {
        let a = SessionIdentity::generate();
        let b = SessionIdentity::generate();
        assert!(SessionIdentity::is_valid(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_valid_rejects_non_canonical_forms() {
        assert!(!SessionIdentity::is_valid("not-a-uuid"));
        assert!(!SessionIdentity::is_valid(""));
        assert!(!SessionIdentity::is_valid("6ba7b8109dad11d180b400c04fd430c8"));
        assert!(!SessionIdentity::is_valid("{6ba7b810-9dad-11d1-80b4-00c04fd430c8}"));
        // version 0
        assert!(!SessionIdentity::is_valid("6ba7b810-9dad-01d1-80b4-00c04fd430c8"));
    }

    #[test]
    fn test_is_valid_accepts_rfc_versions_and_specials() {
        assert!(SessionIdentity::is_valid("6ba7b810-9dad-11d1-80b4-00c04fd430c8"));
        assert!(SessionIdentity::is_valid("6BA7B810-9DAD-11D1-80B4-00C04FD430C8"));
        assert!(SessionIdentity::is_valid("00000000-0000-0000-0000-000000000000"));
        assert!(SessionIdentity::is_valid("ffffffff-ffff-ffff-ffff-ffffffffffff"));
    }

    #[test]
    fn test_resolve_without_persistence_ignores_storage() {
        let store = MemoryStore::new();
        let stored = SessionIdentity::generate();
        store.set(SESSION_STORAGE_KEY, &stored).unwrap();

        let resolved = SessionIdentity::resolve(false, &store);
        assert_ne!(resolved, stored);
        assert_eq!(store.get(SESSION_STORAGE_KEY), Some(stored));
    }

    #[test]
    fn test_resolve_with_persistence_is_idempotent() {
        let store = MemoryStore::new();
        let first = SessionIdentity::resolve(true, &store);
        let second = SessionIdentity::resolve(true, &store);
        assert_eq!(first, second);
        assert_eq!(store.get(SESSION_STORAGE_KEY), Some(first));
    }

    #[test]
    fn test_resolve_replaces_invalid_stored_value() {
        let store = MemoryStore::new();
        store.set(SESSION_STORAGE_KEY, "not-a-uuid").unwrap();

        let resolved = SessionIdentity::resolve(true, &store);
        assert_ne!(resolved, "not-a-uuid");
        assert!(SessionIdentity::is_valid(&resolved));
        assert_eq!(store.get(SESSION_STORAGE_KEY), Some(resolved));
    }

    #[test]
    fn test_session_public_data_replacement() {
        let session = Session::new("id-1", "debug", Map::new());
        assert!(session.public_data().is_empty());

        let Value::Object(data) = json!({"nick": "ada"}) else { unreachable!() };
        session.replace_public_data(data);
        assert_eq!(session.public_data().get("nick"), Some(&json!("ada")));
        assert_eq!(session.id(), "id-1");
        assert_eq!(session.package_name(), "debug");
    }
}
