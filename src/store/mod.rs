//! Session store: records, the provider contract and the backends behind it.
//!
//! A backend owns every [`Record`] it creates. Callers receive a [`Session`]
//! handle that shares the record's data and holds a non-owning back-reference
//! to the backend, which it uses to refresh the record's recency on access.

pub mod clock;
pub mod memory;
pub mod registry;

#[cfg(test)]
pub(crate) mod conformance;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryProvider;
pub use registry::ProviderRegistry;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

/// Contract every session backend implements.
///
/// All methods take `&self`; backends synchronize internally and are shared
/// behind `Arc<dyn Provider>`.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Create the session for `sid`. Returns the live session if one exists.
    fn init(&self, sid: &str) -> Result<Session>;

    /// Fetch the session for `sid`, creating it when absent.
    ///
    /// Fetching alone does not refresh recency; data access does.
    fn read(&self, sid: &str) -> Result<Session>;

    /// Remove the session for `sid`. Unknown identifiers are a no-op.
    fn destroy(&self, sid: &str) -> Result<()>;

    /// Remove every session idle for strictly longer than `max_idle`.
    /// Returns how many were removed.
    fn gc(&self, max_idle: Duration) -> Result<usize>;

    /// Number of live sessions.
    fn session_count(&self) -> usize;
}

/// Backend hook a [`Session`] calls after touching its data.
pub trait RecencyTracker: Send + Sync {
    /// Move `record` to the most-recent position and stamp its access time.
    /// Must do nothing if `record` is no longer the live record for its id.
    fn touch(&self, record: &Arc<Record>);
}

/// Per-identifier key/value bag plus access metadata.
#[derive(Debug)]
pub struct Record {
    sid: String,
    created_at: DateTime<Utc>,
    last_accessed: Mutex<Instant>,
    data: RwLock<HashMap<String, Value>>,
}

impl Record {
    pub fn new(sid: impl Into<String>, now: Instant) -> Self {
        Record {
            sid: sid.into(),
            created_at: Utc::now(),
            last_accessed: Mutex::new(now),
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> Instant {
        *self
            .last_accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamp the access time. Backends call this while holding their lock.
    pub fn mark_accessed(&self, at: Instant) {
        *self
            .last_accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = at;
    }

    /// Time since last access, zero if `now` is earlier.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed())
    }
}

/// Caller-facing handle to one session.
///
/// Clones share the same record. Every data access refreshes the session's
/// recency in the owning backend.
#[derive(Clone)]
pub struct Session {
    record: Arc<Record>,
    tracker: Weak<dyn RecencyTracker>,
}

impl Session {
    pub fn new(record: Arc<Record>, tracker: Weak<dyn RecencyTracker>) -> Self {
        Session { record, tracker }
    }

    /// The session identifier
    pub fn id(&self) -> &str {
        self.record.sid()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at()
    }

    pub fn last_accessed(&self) -> Instant {
        self.record.last_accessed()
    }

    /// Read a value and deserialize it into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read the raw JSON value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let value = self.read_data().get(key).cloned();
        self.refresh();
        value
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.write_data().insert(key.into(), value);
        self.refresh();
        Ok(())
    }

    /// Remove `key`, returning the previous value.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.write_data().remove(key);
        self.refresh();
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let found = self.read_data().contains_key(key);
        self.refresh();
        found
    }

    /// Copy of all stored data.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let data = self.read_data().clone();
        self.refresh();
        data
    }

    /// Whether both handles point at the same record instance.
    pub fn same_record(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }

    fn refresh(&self) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.touch(&self.record);
        }
    }

    fn read_data(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Value>> {
        self.record
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.record
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &crate::sid::short(self.id()))
            .field("created_at", &self.created_at())
            .finish()
    }
}
