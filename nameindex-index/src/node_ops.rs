//! `NodeOps`: a thin adaptor from a skip-list entry's node id to
//! `SortedBatchStore` operations.
//!
//! This is deliberately a pass-through layer: every method forwards to the
//! like-named `SortedBatchStore` method. Its only job is to give
//! `ItemList` a narrower, node-id-scoped vocabulary to call against, and a
//! single place to log backend failures before they propagate.

use crate::sorted_batch_store::SortedBatchStore;
use log::warn;
use nameindex_core::{NodeId, Result};
use std::sync::Arc;

fn logged<T>(node_id: NodeId, op: &str, result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        warn!("{op}({node_id}) failed: {e}");
    }
    result
}

pub struct NodeOps {
    store: Arc<dyn SortedBatchStore>,
}

impl NodeOps {
    pub fn new(store: Arc<dyn SortedBatchStore>) -> Self {
        Self { store }
    }

    pub async fn contains(&self, node_id: NodeId, name: &[u8]) -> Result<bool> {
        logged(node_id, "contains", self.store.contains(node_id, name).await)
    }

    pub async fn size(&self, node_id: NodeId) -> Result<usize> {
        logged(node_id, "size", self.store.size(node_id).await)
    }

    pub async fn add(&self, node_id: NodeId, name: &[u8]) -> Result<()> {
        logged(node_id, "add", self.store.add(node_id, name).await)
    }

    pub async fn add_all(&self, node_id: NodeId, names: &[Vec<u8>]) -> Result<()> {
        logged(node_id, "add_all", self.store.add_all(node_id, names).await)
    }

    pub async fn remove(&self, node_id: NodeId, name: &[u8]) -> Result<()> {
        logged(node_id, "remove", self.store.remove(node_id, name).await)
    }

    pub async fn drop(&self, node_id: NodeId) -> Result<()> {
        logged(node_id, "drop", self.store.drop_batch(node_id).await)
    }

    /// Smallest name in the batch, or `None` if empty. Pure read: see the
    /// resolved "destructive min" note in the crate docs.
    pub async fn min(&self, node_id: NodeId) -> Result<Option<Vec<u8>>> {
        logged(node_id, "min", self.store.min(node_id).await)
    }

    pub async fn inner_position(&self, node_id: NodeId, name: &[u8]) -> Result<usize> {
        logged(
            node_id,
            "inner_position",
            self.store.inner_position(node_id, name).await,
        )
    }

    pub async fn range_before(&self, node_id: NodeId, stop: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        logged(
            node_id,
            "range_before",
            self.store.range_before(node_id, stop).await,
        )
    }

    pub async fn range_after(&self, node_id: NodeId, start: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        logged(
            node_id,
            "range_after",
            self.store.range_after(node_id, start).await,
        )
    }

    pub async fn delete_before(&self, node_id: NodeId, stop: &[u8]) -> Result<()> {
        logged(
            node_id,
            "delete_before",
            self.store.delete_before(node_id, stop).await,
        )
    }

    pub async fn delete_after(&self, node_id: NodeId, start: &[u8]) -> Result<()> {
        logged(
            node_id,
            "delete_after",
            self.store.delete_after(node_id, start).await,
        )
    }

    pub async fn scan_from(
        &self,
        node_id: NodeId,
        start: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<bool> {
        logged(
            node_id,
            "scan_from",
            self.store.scan_from(node_id, start, visit).await,
        )
    }
}
