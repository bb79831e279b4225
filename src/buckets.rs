//! Buckets
//!
//! Registry mapping bucket names to open stores. All stores are created
//! eagerly, either all in memory or all as files under one directory.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{duplicate_bucket, validate_bucket_name, Config, StorageMode};
use crate::error::{Result, RowError};
use crate::store::{FileStore, MemoryStore, Store};

/// Named stores owned by one server instance
pub struct Buckets {
    stores: BTreeMap<String, Arc<dyn Store>>,
}

impl Buckets {
    /// One memory store per name
    pub fn memory<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(names, |_| Ok(Arc::new(MemoryStore::new()) as Arc<dyn Store>))
    }

    /// One file store per name, each at `{directory}/{name}`
    pub fn files<I, S>(directory: &Path, lock_timeout: Duration, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        std::fs::create_dir_all(directory)?;
        Self::build(names, |name| {
            let store = FileStore::open(name, directory.join(name), lock_timeout)?;
            Ok(Arc::new(store) as Arc<dyn Store>)
        })
    }

    /// Buckets as described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.storage {
            StorageMode::Memory => Self::memory(&config.buckets),
            StorageMode::Directory(dir) => Self::files(dir, config.file_lock_timeout, &config.buckets),
        }
    }

    /// Buckets over already-open stores
    pub fn from_stores<I>(stores: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Arc<dyn Store>)>,
    {
        let mut map = BTreeMap::new();
        for (name, store) in stores {
            validate_bucket_name(&name)?;
            if map.contains_key(&name) {
                return Err(duplicate_bucket(&name));
            }
            map.insert(name, store);
        }
        Ok(Self { stores: map })
    }

    fn build<I, S, F>(names: I, mut open: F) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&str) -> Result<Arc<dyn Store>>,
    {
        let mut buckets = Self { stores: BTreeMap::new() };
        for name in names {
            let name = name.as_ref();
            let opened = validate_bucket_name(name).and_then(|_| {
                // A second open of the same file would wait out the lock timeout
                if buckets.stores.contains_key(name) {
                    return Err(duplicate_bucket(name));
                }
                open(name)
            });
            match opened {
                Ok(store) => {
                    buckets.stores.insert(name.to_string(), store);
                }
                Err(e) => {
                    // Release whatever was already opened
                    let _ = buckets.close();
                    return Err(e);
                }
            }
        }
        Ok(buckets)
    }

    /// Look up a bucket by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Store>> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| RowError::InvalidBucket(name.to_string()))
    }

    /// Bucket names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Close every store, returning the first failure after trying them all
    pub fn close(&self) -> Result<()> {
        let mut first_error = None;
        for (name, store) in &self.stores {
            if let Err(e) = store.close() {
                tracing::warn!("failed to close bucket {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Buckets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buckets").field("names", &self.names()).finish()
    }
}
