//! Pending-request bookkeeping.
//!
//! Every request kind owns one callback slot. Registering a new callback for
//! a kind replaces the previous one, and resolving a result hands out the
//! slot's callback without clearing it:
//!
//! * two overlapping calls of the same kind race, and only the second
//!   caller ever hears back;
//! * a duplicate result re-invokes the registered callback.
//!
//! [`CorrelationMode::Correlated`] tags each request with an id. Results
//! that echo the id resolve exactly their own callback, once. Results
//! without an id still fall back to the per-kind slot and retire every
//! tagged request of that kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Callback receiving a decoded result payload.
pub type ResultCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Wrap a closure as a [`ResultCallback`].
pub fn callback<F>(f: F) -> ResultCallback
where
    F: Fn(Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How results are matched to the requests that caused them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMode {
    /// One slot per request kind, last registration wins.
    #[default]
    Legacy,
    /// Requests carry a `request_id` echoed by the host.
    Correlated,
}

impl CorrelationMode {
    /// Parse the option spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "legacy" => Some(Self::Legacy),
            "correlated" => Some(Self::Correlated),
            _ => None,
        }
    }
}

struct SlotTable<K> {
    slots: HashMap<K, ResultCallback>,
    in_flight: HashMap<u64, (K, ResultCallback)>,
}

/// Callback slots for one family of request kinds.
pub struct RequestCorrelator<K> {
    mode: CorrelationMode,
    next_id: AtomicU64,
    table: Mutex<SlotTable<K>>,
}

impl<K> fmt::Debug for RequestCorrelator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("mode", &self.mode)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K> RequestCorrelator<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    /// Create an empty correlator.
    pub fn new(mode: CorrelationMode) -> Self {
        Self {
            mode,
            next_id: AtomicU64::new(1),
            table: Mutex::new(SlotTable { slots: HashMap::new(), in_flight: HashMap::new() }),
        }
    }

    /// The matching mode in use.
    pub fn mode(&self) -> CorrelationMode {
        self.mode
    }

    /// Store `callback` as the pending callback for `kind`.
    ///
    /// Returns the request id to put on the outbound envelope in correlated
    /// mode, `None` in legacy mode.
    pub fn register(&self, kind: K, callback: ResultCallback) -> Option<u64> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.slots.insert(kind, Arc::clone(&callback)).is_some() {
            debug!(?kind, "Replaced pending callback");
        }
        match self.mode {
            CorrelationMode::Legacy => None,
            CorrelationMode::Correlated => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                table.in_flight.insert(id, (kind, callback));
                Some(id)
            }
        }
    }

    /// Replace the slot for `kind`, clearing it when `callback` is `None`.
    pub fn replace(&self, kind: K, callback: Option<ResultCallback>) -> Option<u64> {
        match callback {
            Some(callback) => self.register(kind, callback),
            None => {
                let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
                table.slots.remove(&kind);
                None
            }
        }
    }

    /// Find the callback that a result of `kind` should invoke.
    ///
    /// The callback is returned rather than invoked so that it runs outside
    /// the lock and may itself issue new requests.
    pub fn resolve(&self, kind: K, request_id: Option<u64>) -> Option<ResultCallback> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        match (self.mode, request_id) {
            (CorrelationMode::Correlated, Some(id)) => match table.in_flight.remove(&id) {
                Some((pending_kind, callback)) if pending_kind == kind => Some(callback),
                Some(entry) => {
                    debug!(request_id = id, ?kind, "Result kind does not match request");
                    table.in_flight.insert(id, entry);
                    None
                }
                None => {
                    debug!(request_id = id, ?kind, "No request in flight for result");
                    None
                }
            },
            (CorrelationMode::Correlated, None) => {
                let before = table.in_flight.len();
                table.in_flight.retain(|_, (pending_kind, _)| *pending_kind != kind);
                let retired = before - table.in_flight.len();
                if retired > 0 {
                    debug!(?kind, retired, "Result without request id retired pending requests");
                }
                table.slots.get(&kind).cloned()
            }
            (CorrelationMode::Legacy, _) => table.slots.get(&kind).cloned(),
        }
    }

    /// Whether a callback is registered for `kind`.
    pub fn is_registered(&self, kind: K) -> bool {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.slots.contains_key(&kind)
    }

    /// Number of correlated requests still awaiting a result.
    pub fn in_flight(&self) -> usize {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.in_flight.len()
    }
}
