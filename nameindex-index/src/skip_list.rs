//! The `SkipList` collaborator: an ordered map from leading key to node id.
//!
//! The persistence format and internal arena/level structure of the skip
//! list are out of scope for this crate (see the crate root docs); only the
//! capability set the index needs from it is defined here, plus an
//! in-memory implementation for tests.

use async_trait::async_trait;
use nameindex_core::{Error, NodeId, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// One entry in the skip list: a leading key paired with the node id it
/// names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipListEntry {
    pub key: Vec<u8>,
    pub node_id: NodeId,
}

/// The result of a `find_greater_or_equal` lookup.
///
/// `found` is `true` exactly when `next.key == key`; it is otherwise a
/// positional detail callers must not rely on (see the source's own
/// guidance, carried forward in the crate docs).
#[derive(Debug, Clone)]
pub struct FindResult {
    pub prev: Option<SkipListEntry>,
    pub next: Option<SkipListEntry>,
    pub found: bool,
}

/// Ordered map from leading key (a byte string) to node id.
///
/// A remote implementation of this trait is the natural way to bind the
/// index to a real persistent skip list; none ships in this crate because
/// the skip list's own storage format is out of scope (§1 of the design
/// notes).
#[async_trait]
pub trait SkipList: Send + Sync {
    /// Finds the entry with the smallest key `>= key`, and its predecessor.
    async fn find_greater_or_equal(&self, key: &[u8]) -> Result<FindResult>;

    /// Returns the entry with the largest key, if any.
    async fn get_largest(&self) -> Result<Option<SkipListEntry>>;

    /// Loads the entry for a given node id, if still live.
    #[allow(dead_code)]
    async fn load(&self, node_id: NodeId) -> Result<Option<SkipListEntry>>;

    /// Returns the first (smallest-key) entry, if any.
    async fn first(&self) -> Result<Option<SkipListEntry>>;

    /// Returns the entry with the smallest key strictly greater than `key`.
    async fn next_after(&self, key: &[u8]) -> Result<Option<SkipListEntry>>;

    /// Inserts (or reinserts) an entry under `key`.
    ///
    /// If `id_hint` is `Some`, the hinted id is reused (used when an entry
    /// is deleted and immediately reinserted under a new key, to preserve
    /// its node id); otherwise a fresh id is allocated.
    async fn insert_by_key(&self, key: Vec<u8>, id_hint: Option<NodeId>) -> Result<NodeId>;

    /// Deletes the entry keyed by `key`, returning its node id if one
    /// existed.
    async fn delete_by_key(&self, key: &[u8]) -> Result<Option<NodeId>>;
}

/// An in-memory `SkipList` backed by a `BTreeMap`, for tests.
///
/// Because `prev`/`next` are recomputed from the map on every call rather
/// than stored as linked pointers, there is no arena/back-reference
/// bookkeeping to get wrong — the classic cyclic-pointer hazard of a real
/// skip list implementation simply does not arise here.
pub struct InMemorySkipList {
    inner: Mutex<Inner>,
}

struct Inner {
    entries: BTreeMap<Vec<u8>, NodeId>,
    next_id: u64,
}

impl InMemorySkipList {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemorySkipList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SkipList for InMemorySkipList {
    async fn find_greater_or_equal(&self, key: &[u8]) -> Result<FindResult> {
        let inner = self.inner.lock();
        let mut range = inner.entries.range(key.to_vec()..);
        let next = range.next().map(|(k, id)| SkipListEntry {
            key: k.clone(),
            node_id: *id,
        });
        let found = next.as_ref().map(|e| e.key == key).unwrap_or(false);
        let prev = inner
            .entries
            .range(..key.to_vec())
            .next_back()
            .map(|(k, id)| SkipListEntry {
                key: k.clone(),
                node_id: *id,
            });
        Ok(FindResult { prev, next, found })
    }

    async fn get_largest(&self) -> Result<Option<SkipListEntry>> {
        let inner = self.inner.lock();
        Ok(inner.entries.iter().next_back().map(|(k, id)| SkipListEntry {
            key: k.clone(),
            node_id: *id,
        }))
    }

    async fn load(&self, node_id: NodeId) -> Result<Option<SkipListEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .iter()
            .find(|(_, id)| **id == node_id)
            .map(|(k, id)| SkipListEntry {
                key: k.clone(),
                node_id: *id,
            }))
    }

    async fn first(&self) -> Result<Option<SkipListEntry>> {
        let inner = self.inner.lock();
        Ok(inner.entries.iter().next().map(|(k, id)| SkipListEntry {
            key: k.clone(),
            node_id: *id,
        }))
    }

    async fn next_after(&self, key: &[u8]) -> Result<Option<SkipListEntry>> {
        let inner = self.inner.lock();
        let mut range = inner.entries.range((
            std::ops::Bound::Excluded(key.to_vec()),
            std::ops::Bound::Unbounded,
        ));
        Ok(range.next().map(|(k, id)| SkipListEntry {
            key: k.clone(),
            node_id: *id,
        }))
    }

    async fn insert_by_key(&self, key: Vec<u8>, id_hint: Option<NodeId>) -> Result<NodeId> {
        if key.is_empty() {
            return Err(Error::InvariantViolation(
                "skip list key must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.lock();
        let id = match id_hint {
            Some(id) => id,
            None => {
                let id = NodeId(inner.next_id);
                inner.next_id += 1;
                id
            }
        };
        inner.entries.insert(key, id);
        Ok(id)
    }

    async fn delete_by_key(&self, key: &[u8]) -> Result<Option<NodeId>> {
        let mut inner = self.inner.lock();
        Ok(inner.entries.remove(key))
    }
}
