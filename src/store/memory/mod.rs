//! Memory Store
//!
//! Volatile backend: a [`SortedKeyMap`] behind a single `parking_lot::RwLock`.
//!
//! ## Concurrency
//! - Reads (get, each scan pull) take the shared lock
//! - Writes (set, delete, close) take the exclusive lock for the whole store
//!
//! ## Scans Are Not Snapshots
//! A scan walks the live index one pull at a time, re-reading under the read
//! lock on every pull. A write that lands while a scan is open over the same
//! range may or may not be observed. Each value is read whole under the lock,
//! so a record is never seen half-written, and the walk resumes strictly
//! after the last emitted key, so order and range bounds always hold.

mod sorted_map;

pub use sorted_map::SortedKeyMap;

use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ScanContext;
use crate::error::{Result, RowError};
use crate::iterator::{RawCursor, RawEntry, RawSource};

use super::Store;

/// `None` once the store is closed
type Shared = Arc<RwLock<Option<SortedKeyMap>>>;

/// In-memory store
pub struct MemoryStore {
    inner: Shared,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(SortedKeyMap::new()))),
        }
    }

    /// Number of stored keys (0 once closed)
    pub fn len(&self) -> usize {
        self.inner.read().as_ref().map_or(0, SortedKeyMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn set_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let value = value.to_vec();
        let mut guard = self.inner.write();
        let map = guard.as_mut().ok_or(RowError::StoreClosed)?;
        map.set(key, value);
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Vec<u8>> {
        let guard = self.inner.read();
        let map = guard.as_ref().ok_or(RowError::StoreClosed)?;
        map.get(key).map(<[u8]>::to_vec).ok_or(RowError::KeyNotFound)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let map = guard.as_mut().ok_or(RowError::StoreClosed)?;
        map.delete(key);
        Ok(())
    }

    fn scan_raw(&self, ctx: &ScanContext, from_key: &[u8], to_key: &[u8]) -> Result<RawCursor> {
        let guard = self.inner.read();
        let map = guard.as_ref().ok_or(RowError::StoreClosed)?;

        // [start, end) over the index as it stands right now
        let start = map.lower_bound(from_key);
        let end = map.upper_bound(to_key);
        if from_key > to_key || start >= end {
            return Ok(RawCursor::empty());
        }

        let walk = IndexWalk {
            inner: Arc::clone(&self.inner),
            resume: Bound::Included(from_key.to_vec()),
            to_key: to_key.to_vec(),
        };
        Ok(RawCursor::new(ctx.clone(), walk))
    }

    fn close(&self) -> Result<()> {
        if self.inner.write().take().is_some() {
            tracing::debug!("memory store closed");
        }
        Ok(())
    }
}

/// Raw source walking the live key index
struct IndexWalk {
    inner: Shared,

    /// Where the next pull starts
    resume: Bound<Vec<u8>>,

    to_key: Vec<u8>,
}

impl RawSource for IndexWalk {
    fn pull(&mut self) -> Result<Option<RawEntry>> {
        let guard = self.inner.read();
        let map = guard.as_ref().ok_or(RowError::StoreClosed)?;

        let index = match &self.resume {
            Bound::Included(key) => map.lower_bound(key),
            Bound::Excluded(key) => map.upper_bound(key),
            Bound::Unbounded => 0,
        };

        let key = match map.key_at(index) {
            Some(key) if key <= self.to_key.as_slice() => key.to_vec(),
            _ => return Ok(None),
        };

        let value = map.get(&key).ok_or_else(|| {
            RowError::InternalConsistency(format!(
                "key {:?} is in the index but not the mapping",
                key
            ))
        })?;

        let more = map
            .key_at(index + 1)
            .map_or(false, |next| next <= self.to_key.as_slice());

        let entry = RawEntry::new(key.clone(), value.to_vec(), more);
        self.resume = Bound::Excluded(key);
        Ok(Some(entry))
    }
}
