//! In-memory session backend.
//!
//! Records live in a single `LruCache`, which is both the identifier index
//! (hash map) and the eviction order (doubly-linked list, most recent at the
//! front). One mutex guards it, so the two views can never disagree.
//! All data is lost on restart.

use super::clock::{Clock, SystemClock};
use super::{Provider, RecencyTracker, Record, Session};
use crate::error::Result;
use crate::sid::short;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// In-memory [`Provider`]. Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    entries: Mutex<LruCache<String, Arc<Record>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryInner {
    fn entries(&self) -> MutexGuard<'_, LruCache<String, Arc<Record>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecencyTracker for MemoryInner {
    fn touch(&self, record: &Arc<Record>) {
        let mut entries = self.entries();
        let is_live = entries
            .peek(record.sid())
            .is_some_and(|live| Arc::ptr_eq(live, record));
        if is_live {
            entries.promote(record.sid());
            record.mark_accessed(self.clock.now());
        }
    }
}

impl MemoryProvider {
    /// Unbounded store on the system clock
    pub fn new() -> Self {
        Self::build(None, Arc::new(SystemClock))
    }

    /// Store holding at most `max_entries` sessions; creating one more
    /// evicts the least recently used.
    pub fn with_capacity(max_entries: NonZeroUsize) -> Self {
        Self::build(Some(max_entries), Arc::new(SystemClock))
    }

    pub fn build(max_entries: Option<NonZeroUsize>, clock: Arc<dyn Clock>) -> Self {
        let entries = match max_entries {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        MemoryProvider {
            inner: Arc::new(MemoryInner {
                entries: Mutex::new(entries),
                clock,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers ordered most recent first.
    pub fn ids_by_recency(&self) -> Vec<String> {
        self.inner.entries().iter().map(|(sid, _)| sid.clone()).collect()
    }

    fn handle(&self, record: Arc<Record>) -> Session {
        let tracker: Weak<MemoryInner> = Arc::downgrade(&self.inner);
        Session::new(record, tracker)
    }

    fn fetch_or_create(&self, sid: &str) -> Session {
        let mut entries = self.inner.entries();
        if let Some(existing) = entries.peek(sid) {
            return self.handle(Arc::clone(existing));
        }

        let record = Arc::new(Record::new(sid, self.inner.clock.now()));
        if let Some((evicted, _)) = entries.push(sid.to_string(), Arc::clone(&record)) {
            tracing::debug!("Memory store: evicted session {} (capacity)", short(&evicted));
        }
        tracing::debug!("Memory store: created session {}", short(sid));
        drop(entries);

        self.handle(record)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for MemoryProvider {
    fn init(&self, sid: &str) -> Result<Session> {
        Ok(self.fetch_or_create(sid))
    }

    fn read(&self, sid: &str) -> Result<Session> {
        Ok(self.fetch_or_create(sid))
    }

    fn destroy(&self, sid: &str) -> Result<()> {
        if self.inner.entries().pop(sid).is_some() {
            tracing::debug!("Memory store: destroyed session {}", short(sid));
        }
        Ok(())
    }

    fn gc(&self, max_idle: Duration) -> Result<usize> {
        let mut entries = self.inner.entries();
        let now = self.inner.clock.now();
        let mut removed = 0;

        // Oldest first; everything after the first survivor is newer.
        while let Some((_, oldest)) = entries.peek_lru() {
            if oldest.idle_for(now) <= max_idle {
                break;
            }
            if let Some((sid, _)) = entries.pop_lru() {
                tracing::debug!("Memory store: expired session {}", short(&sid));
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn session_count(&self) -> usize {
        self.len()
    }
}
