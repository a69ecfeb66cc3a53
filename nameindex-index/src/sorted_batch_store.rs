//! The `SortedBatchStore` collaborator: a lexicographically ordered set of
//! byte-strings per node id.
//!
//! A typical backing is a Redis-style sorted set with equal scores and
//! lex-range operators, but any ordered-set with this capability set
//! suffices. The range-boundary encoding (`[x`/`(x`/`-`/`+`) a remote
//! backend would use on the wire is an implementation detail below this
//! trait: here boundaries are plain `Option<&[u8]>`.

use async_trait::async_trait;
use nameindex_core::{NodeId, Result};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

/// Ordered set of names per node id.
#[async_trait]
pub trait SortedBatchStore: Send + Sync {
    /// True iff the batch for `node_id` contains `name`.
    async fn contains(&self, node_id: NodeId, name: &[u8]) -> Result<bool>;

    /// Current cardinality of the batch for `node_id`.
    async fn size(&self, node_id: NodeId) -> Result<usize>;

    /// Inserts `name` into the batch; a name already present is a no-op.
    async fn add(&self, node_id: NodeId, name: &[u8]) -> Result<()>;

    /// Inserts every name in `names` into the batch.
    async fn add_all(&self, node_id: NodeId, names: &[Vec<u8>]) -> Result<()> {
        for name in names {
            self.add(node_id, name).await?;
        }
        Ok(())
    }

    /// Removes `name` from the batch; a missing name is a no-op.
    async fn remove(&self, node_id: NodeId, name: &[u8]) -> Result<()>;

    /// Removes the entire batch.
    async fn drop_batch(&self, node_id: NodeId) -> Result<()>;

    /// Returns the smallest name in the batch, without mutating it.
    ///
    /// Must be a pure read: the source's `min` implementation pops the
    /// minimum, which is wrong here because invariant-repair code writes
    /// the same minimum back as a skip-list leading key.
    async fn min(&self, node_id: NodeId) -> Result<Option<Vec<u8>>>;

    /// Count of names strictly less than `name` in the batch.
    async fn inner_position(&self, node_id: NodeId, name: &[u8]) -> Result<usize>;

    /// Names strictly less than `stop`, in ascending order. `stop == None`
    /// means "all names in the batch".
    async fn range_before(&self, node_id: NodeId, stop: Option<&[u8]>) -> Result<Vec<Vec<u8>>>;

    /// Names strictly greater than `start`, in ascending order. `start ==
    /// None` means "all names in the batch".
    async fn range_after(&self, node_id: NodeId, start: Option<&[u8]>) -> Result<Vec<Vec<u8>>>;

    /// Removes all names strictly less than `stop`.
    async fn delete_before(&self, node_id: NodeId, stop: &[u8]) -> Result<()>;

    /// Removes all names strictly greater than `start`.
    async fn delete_after(&self, node_id: NodeId, start: &[u8]) -> Result<()>;

    /// Invokes `visit` on each name `>= start` in ascending order (`start ==
    /// None` means from the beginning). Stops early, returning `false`, if
    /// `visit` returns `false`; otherwise returns `true`.
    async fn scan_from(
        &self,
        node_id: NodeId,
        start: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<bool>;
}

/// An in-memory `SortedBatchStore` backed by one `BTreeSet` per node id, for
/// tests.
pub struct InMemorySortedBatchStore {
    batches: Mutex<HashMap<NodeId, BTreeSet<Vec<u8>>>>,
}

impl InMemorySortedBatchStore {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySortedBatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SortedBatchStore for InMemorySortedBatchStore {
    async fn contains(&self, node_id: NodeId, name: &[u8]) -> Result<bool> {
        let batches = self.batches.lock();
        Ok(batches
            .get(&node_id)
            .map(|b| b.contains(name))
            .unwrap_or(false))
    }

    async fn size(&self, node_id: NodeId) -> Result<usize> {
        let batches = self.batches.lock();
        Ok(batches.get(&node_id).map(|b| b.len()).unwrap_or(0))
    }

    async fn add(&self, node_id: NodeId, name: &[u8]) -> Result<()> {
        let mut batches = self.batches.lock();
        batches.entry(node_id).or_default().insert(name.to_vec());
        Ok(())
    }

    async fn remove(&self, node_id: NodeId, name: &[u8]) -> Result<()> {
        let mut batches = self.batches.lock();
        if let Some(batch) = batches.get_mut(&node_id) {
            batch.remove(name);
        }
        Ok(())
    }

    async fn drop_batch(&self, node_id: NodeId) -> Result<()> {
        let mut batches = self.batches.lock();
        batches.remove(&node_id);
        Ok(())
    }

    async fn min(&self, node_id: NodeId) -> Result<Option<Vec<u8>>> {
        let batches = self.batches.lock();
        Ok(batches
            .get(&node_id)
            .and_then(|b| b.iter().next().cloned()))
    }

    async fn inner_position(&self, node_id: NodeId, name: &[u8]) -> Result<usize> {
        let batches = self.batches.lock();
        Ok(batches
            .get(&node_id)
            .map(|b| b.range(..name.to_vec()).count())
            .unwrap_or(0))
    }

    async fn range_before(&self, node_id: NodeId, stop: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        let batches = self.batches.lock();
        let Some(batch) = batches.get(&node_id) else {
            return Ok(Vec::new());
        };
        Ok(match stop {
            Some(stop) => batch.range(..stop.to_vec()).cloned().collect(),
            None => batch.iter().cloned().collect(),
        })
    }

    async fn range_after(&self, node_id: NodeId, start: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        let batches = self.batches.lock();
        let Some(batch) = batches.get(&node_id) else {
            return Ok(Vec::new());
        };
        Ok(match start {
            Some(start) => batch
                .range((
                    std::ops::Bound::Excluded(start.to_vec()),
                    std::ops::Bound::Unbounded,
                ))
                .cloned()
                .collect(),
            None => batch.iter().cloned().collect(),
        })
    }

    async fn delete_before(&self, node_id: NodeId, stop: &[u8]) -> Result<()> {
        let mut batches = self.batches.lock();
        if let Some(batch) = batches.get_mut(&node_id) {
            let keep: BTreeSet<Vec<u8>> = batch.split_off(&stop.to_vec());
            *batch = keep;
        }
        Ok(())
    }

    async fn delete_after(&self, node_id: NodeId, start: &[u8]) -> Result<()> {
        let mut batches = self.batches.lock();
        if let Some(batch) = batches.get_mut(&node_id) {
            // split_off(start) keeps `start` itself in the upper half along
            // with everything after it; we want to discard the upper half
            // but keep `start`, so move it back if it was present.
            let upper = batch.split_off(&start.to_vec());
            if upper.contains(start) {
                batch.insert(start.to_vec());
            }
        }
        Ok(())
    }

    async fn scan_from(
        &self,
        node_id: NodeId,
        start: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<bool> {
        let names: Vec<Vec<u8>> = {
            let batches = self.batches.lock();
            let Some(batch) = batches.get(&node_id) else {
                return Ok(true);
            };
            match start {
                Some(start) => batch.range(start.to_vec()..).cloned().collect(),
                None => batch.iter().cloned().collect(),
            }
        };
        for name in names {
            if !visit(&name) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
