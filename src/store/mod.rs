//! Store Module
//!
//! The storage contract shared by every backend, plus the backends.
//!
//! ## Backends
//! - [`MemoryStore`]: volatile; hash map + sorted key index behind one RwLock
//! - [`FileStore`]: durable; one redb file per bucket, scans relayed from a
//!   background transaction
//!
//! ## Layering
//! [`Store`] is byte-level and object safe so buckets can hold
//! `Arc<dyn Store>`. [`StoreExt`] layers the typed, codec-driven operations on
//! top of any store.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, SortedKeyMap};

use crate::context::ScanContext;
use crate::error::Result;
use crate::iterator::{RawCursor, RecordIterator};
use crate::record::Codec;

/// Byte-level storage contract
///
/// All operations fail with `RowError::StoreClosed` after `close()`.
pub trait Store: Send + Sync {
    /// Insert or replace the value for `key` (last writer wins)
    fn set_raw(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetch the value for `key`, or `RowError::KeyNotFound`
    fn get_raw(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Remove `key` if present
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Open a raw cursor over `[from_key, to_key]`
    ///
    /// Returns immediately; elements are produced as the cursor is pulled.
    /// `from_key > to_key` is an empty range, not an error.
    fn scan_raw(&self, ctx: &ScanContext, from_key: &[u8], to_key: &[u8]) -> Result<RawCursor>;

    /// Release all resources. Idempotent.
    fn close(&self) -> Result<()>;
}

/// Typed operations available on every [`Store`]
pub trait StoreExt: Store {
    /// Encode `record` with `codec` and store it under `key`
    fn set<T, C>(&self, key: &[u8], record: &T, codec: &C) -> Result<()>
    where
        C: Codec<T> + ?Sized,
    {
        let bytes = codec.encode(record)?;
        self.set_raw(key, &bytes)
    }

    /// Fetch and decode the record under `key`
    fn get<T, C>(&self, key: &[u8], codec: &C) -> Result<T>
    where
        C: Codec<T> + ?Sized,
    {
        let bytes = self.get_raw(key)?;
        codec.decode(&bytes)
    }

    /// Scan `[from_key, to_key]`, decoding with `codec` and keeping records
    /// for which `predicate` holds
    fn scan<T, C, P>(
        &self,
        ctx: &ScanContext,
        from_key: &[u8],
        to_key: &[u8],
        codec: C,
        predicate: P,
    ) -> RecordIterator<T>
    where
        C: Codec<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
    {
        match self.scan_raw(ctx, from_key, to_key) {
            Ok(raw) => RecordIterator::new(raw, codec, predicate),
            Err(e) => RecordIterator::failed(e, codec),
        }
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
