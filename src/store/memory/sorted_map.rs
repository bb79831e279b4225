//! Sorted key map
//!
//! Hash map for point lookups plus an ascending key index for range scans.
//! Both are only ever mutated together, through `set` and `delete`.

use std::collections::HashMap;

/// Key→value mapping with a separately maintained ascending key index
#[derive(Debug, Default)]
pub struct SortedKeyMap {
    mapping: HashMap<Vec<u8>, Vec<u8>>,
    keys: Vec<Vec<u8>>,
}

impl SortedKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.mapping.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.mapping.get(key).map(Vec::as_slice)
    }

    /// Insert or overwrite. A new key is spliced into the index; an existing
    /// key leaves the index untouched.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        match self.mapping.get_mut(key) {
            Some(existing) => *existing = value,
            None => {
                let (index, _) = self.search_key(key);
                self.keys.insert(index, key.to_vec());
                self.mapping.insert(key.to_vec(), value);
            }
        }
    }

    /// Remove from both the mapping and the index. Returns whether the key
    /// was present.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        if self.mapping.remove(key).is_none() {
            return false;
        }
        if let (index, true) = self.search_key(key) {
            self.keys.remove(index);
        }
        true
    }

    /// Binary search over the index: the position of `key` if present,
    /// otherwise the position it would be inserted at
    pub fn search_key(&self, key: &[u8]) -> (usize, bool) {
        match self.keys.binary_search_by(|k| k.as_slice().cmp(key)) {
            Ok(index) => (index, true),
            Err(index) => (index, false),
        }
    }

    /// Index of the first key `>= key`
    pub fn lower_bound(&self, key: &[u8]) -> usize {
        self.search_key(key).0
    }

    /// Index of the first key `> key`
    pub fn upper_bound(&self, key: &[u8]) -> usize {
        match self.search_key(key) {
            (index, true) => index + 1,
            (index, false) => index,
        }
    }

    pub fn key_at(&self, index: usize) -> Option<&[u8]> {
        self.keys.get(index).map(Vec::as_slice)
    }

    /// The ascending key index
    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }
}
