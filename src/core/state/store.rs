// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! In-memory working state and discardable write overlays.

use crate::core::state::persistent_state::KvOp;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered key-value store.
pub trait KvStore {
    /// Get value.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Set value.
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);
    /// Delete key (no-op if absent).
    fn delete(&mut self, key: &[u8]);
    /// All pairs with `start <= key < end` in ascending key order. `None` means unbounded.
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// Smallest key strictly greater than every key starting with `prefix`.
/// `None` when no such key exists (prefix is all 0xff).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

fn bounds<'k>(start: &'k [u8], end: Option<&'k [u8]>) -> (Bound<&'k [u8]>, Bound<&'k [u8]>) {
    (
        Bound::Included(start),
        end.map_or(Bound::Unbounded, Bound::Excluded),
    )
}

/// Working state held in memory. Journals every mutation so a block can be
/// flushed to disk as one atomic batch.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    journal: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl MemStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with already-persisted pairs. The journal starts empty.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data: pairs.into_iter().collect(),
            journal: BTreeMap::new(),
        }
    }

    /// Drain pending mutations as store ops, in key order.
    pub fn take_changes(&mut self) -> Vec<KvOp> {
        std::mem::take(&mut self.journal)
            .into_iter()
            .map(|(key, v)| match v {
                Some(value) => KvOp::Put { key, value },
                None => KvOp::Del { key },
            })
            .collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.journal.insert(key.clone(), Some(value.clone()));
        self.data.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        if self.data.remove(key).is_some() {
            self.journal.insert(key.to_vec(), None);
        }
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range::<[u8], _>(bounds(start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Write overlay over a parent store. Nothing reaches the parent until `flush`;
/// dropping the overlay discards its writes.
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    /// Overlay on `parent`.
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Apply buffered writes to the parent.
    pub fn flush(&mut self) {
        for (k, v) in std::mem::take(&mut self.writes) {
            match v {
                Some(value) => self.parent.set(k, value),
                None => self.parent.delete(&k),
            }
        }
    }

    /// Number of buffered writes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(v) => v.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.range(start, end).into_iter().collect();
        for (k, v) in self.writes.range::<[u8], _>(bounds(start, end)) {
            match v {
                Some(value) => {
                    merged.insert(k.clone(), value.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        merged.into_iter().collect()
    }
}
