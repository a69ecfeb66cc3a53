//! `ItemList`: the ordered-name index core.
//!
//! Coordinates skip-list key management with [`NodeOps`] to implement
//! `insert`, `delete`, `scan`, and `drop_all` while keeping node counts
//! small — each skip-list node batches up to `B` names, so the skip list
//! indexes roughly `ceil(N/B)` entries rather than `N`.

use crate::config::IndexConfig;
use crate::node_ops::NodeOps;
use crate::skip_list::{SkipList, SkipListEntry};
use crate::sorted_batch_store::SortedBatchStore;
use log::{debug, trace, warn};
use nameindex_core::{Error, Name, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The ordered-name index.
///
/// A single instance is not reentrant: concurrent calls against the same
/// instance race on the skip list's "delete old entry, insert replacement"
/// window (see the crate's concurrency notes). A debug reentrancy guard
/// turns that hazard into an `Error::InvariantViolation` instead of silent
/// corruption; it is not a substitute for external serialization across
/// distinct instances sharing a prefix.
pub struct ItemList {
    config: IndexConfig,
    skip_list: Arc<dyn SkipList>,
    node_ops: NodeOps,
    busy: AtomicBool,
}

/// Releases the reentrancy guard on drop, including on early return or
/// error.
struct EntryGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl ItemList {
    /// Builds an index over the given collaborators.
    pub fn new(
        config: IndexConfig,
        skip_list: Arc<dyn SkipList>,
        store: Arc<dyn SortedBatchStore>,
    ) -> Self {
        Self {
            config,
            skip_list,
            node_ops: NodeOps::new(store),
            busy: AtomicBool::new(false),
        }
    }

    fn enter(&self) -> Result<EntryGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvariantViolation(
                "ItemList used reentrantly on the same instance".to_string(),
            ));
        }
        Ok(EntryGuard { busy: &self.busy })
    }

    /// Inserts `name` into the index. Idempotent: inserting a name already
    /// present is a silent no-op.
    pub async fn insert(&self, name: Name) -> Result<()> {
        let _guard = self.enter()?;
        trace!("insert: {name}");
        self.insert_inner(name.as_bytes()).await
    }

    /// Removes `name` from the index. Idempotent: deleting a name not
    /// present is a silent no-op.
    pub async fn delete(&self, name: &[u8]) -> Result<()> {
        let _guard = self.enter()?;
        trace!("delete: {}", String::from_utf8_lossy(name));
        self.delete_inner(name).await
    }

    /// Visits every name `>= from` in ascending order (`from` empty means
    /// from the start), halting as soon as `visit` returns `false`.
    pub async fn scan(&self, from: &[u8], mut visit: impl FnMut(&Name) -> bool) -> Result<()> {
        let _guard = self.enter()?;
        trace!("scan from {}", String::from_utf8_lossy(from));
        self.scan_inner(from, &mut visit).await
    }

    /// Drops every node's batch and skip-list entry, emptying the index.
    pub async fn drop_all(&self) -> Result<()> {
        let _guard = self.enter()?;
        trace!("drop_all");
        let mut current = self.skip_list.first().await?;
        while let Some(entry) = current {
            self.node_ops.drop(entry.node_id).await?;
            self.skip_list.delete_by_key(&entry.key).await?;
            debug!("drop_all: removed node {}", entry.node_id);
            current = self.skip_list.next_after(&entry.key).await?;
        }
        Ok(())
    }

    async fn insert_inner(&self, key: &[u8]) -> Result<()> {
        let located = self.skip_list.find_greater_or_equal(key).await?;
        if located.next.as_ref().map(|e| e.key == key).unwrap_or(false) {
            debug!("insert: leading key already present, no-op");
            return Ok(());
        }

        if let Some(prev) = located.prev.clone() {
            if self.node_ops.contains(prev.node_id, key).await? {
                debug!("insert: already present in predecessor node {}", prev.node_id);
                return Ok(());
            }

            let prev_size = self.node_ops.size(prev.node_id).await?;
            if prev_size < self.config.batch_size {
                self.node_ops.add(prev.node_id, key).await?;
                debug!("insert: appended to predecessor node {}", prev.node_id);
                return Ok(());
            }

            return self.split_insert(&prev, key).await;
        }

        if let Some(next) = located.next.clone() {
            let next_size = self.node_ops.size(next.node_id).await?;
            if next_size < self.config.batch_size {
                return self.absorb_insert(&next, key).await;
            }
        }

        let id = self.skip_list.insert_by_key(key.to_vec(), None).await?;
        self.node_ops.add(id, key).await?;
        debug!("insert: created fresh node {}", id);
        Ok(())
    }

    /// Case 3: `prev` is full. Splits it, promoting whichever side is
    /// smaller into a freshly keyed node.
    async fn split_insert(&self, prev: &SkipListEntry, key: &[u8]) -> Result<()> {
        let x = self.node_ops.inner_position(prev.node_id, key).await?;
        let size = self.node_ops.size(prev.node_id).await?;
        let y = size - x;

        if x == 0 || y == 0 {
            let id = self.skip_list.insert_by_key(key.to_vec(), None).await?;
            self.node_ops.add(id, key).await?;
            debug!("insert: degenerate split at node {}, created fresh node {}", prev.node_id, id);
            return Ok(());
        }

        if x <= y {
            // Left-heavy: promote the smaller (lower) half plus `key` into
            // a new node; `prev` keeps its id and the upper half.
            //
            // The remaining upper half's minimum (not `key` itself, which
            // moves to the new node) becomes `prev`'s new leading key —
            // read it before mutating the batch, the way the upper half is
            // read up front in the right-heavy case below.
            let mut left = self.node_ops.range_before(prev.node_id, Some(key)).await?;
            let right = self.node_ops.range_after(prev.node_id, Some(key)).await?;
            let new_key = left[0].clone();
            let prev_new_key = right[0].clone();
            self.skip_list.delete_by_key(&prev.key).await?;
            let new_id = self.skip_list.insert_by_key(new_key, None).await?;
            left.push(key.to_vec());
            self.node_ops.add_all(new_id, &left).await?;
            self.node_ops.delete_before(prev.node_id, key).await?;
            self.skip_list
                .insert_by_key(prev_new_key, Some(prev.node_id))
                .await?;
            debug!(
                "insert: left-heavy split of node {}, new node {} holds lower half",
                prev.node_id, new_id
            );
            Ok(())
        } else {
            // Right-heavy: promote the smaller (upper) half plus `key` into
            // a new node keyed by `key`; `prev` keeps its leading key and
            // id, losing only the names above `key`.
            let right = self.node_ops.range_after(prev.node_id, Some(key)).await?;
            let new_id = self.skip_list.insert_by_key(key.to_vec(), None).await?;
            let mut batch = Vec::with_capacity(right.len() + 1);
            batch.push(key.to_vec());
            batch.extend(right);
            self.node_ops.add_all(new_id, &batch).await?;
            self.node_ops.delete_after(prev.node_id, key).await?;
            debug!(
                "insert: right-heavy split of node {}, new node {} holds upper half",
                prev.node_id, new_id
            );
            Ok(())
        }
    }

    /// Case 4: absorb `key` into the right neighbor `next`, which lowers
    /// its leading key to `key`.
    async fn absorb_insert(&self, next: &SkipListEntry, key: &[u8]) -> Result<()> {
        let id = self
            .skip_list
            .delete_by_key(&next.key)
            .await?
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "skip list entry for node {} vanished mid-insert",
                    next.node_id
                ))
            })?;
        self.skip_list.insert_by_key(key.to_vec(), Some(id)).await?;
        self.node_ops.add(id, key).await?;
        debug!("insert: absorbed into right neighbor node {}", id);
        Ok(())
    }

    async fn delete_inner(&self, key: &[u8]) -> Result<()> {
        let located = self.skip_list.find_greater_or_equal(key).await?;

        if let Some(next) = located.next.clone() {
            if next.key == key {
                self.skip_list.delete_by_key(key).await?;
                self.node_ops.remove(next.node_id, key).await?;

                let size = self.node_ops.size(next.node_id).await?;
                if size == 0 {
                    self.node_ops.drop(next.node_id).await?;
                    debug!("delete: emptied node {}, dropped", next.node_id);
                    return Ok(());
                }

                let min = self.node_ops.min(next.node_id).await?.ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "node {} has size {} but no minimum",
                        next.node_id, size
                    ))
                })?;
                self.skip_list.insert_by_key(min, Some(next.node_id)).await?;
                debug!("delete: rekeyed node {} after removing leading name", next.node_id);
                return Ok(());
            }
        }

        let Some(prev) = located.prev.clone() else {
            debug!("delete: no predecessor, name not present");
            return Ok(());
        };

        if !self.node_ops.contains(prev.node_id, key).await? {
            debug!("delete: not present in predecessor node {}", prev.node_id);
            return Ok(());
        }

        self.node_ops.remove(prev.node_id, key).await?;
        let prev_size = self.node_ops.size(prev.node_id).await?;

        if prev_size == 0 {
            self.skip_list.delete_by_key(&prev.key).await?;
            self.node_ops.drop(prev.node_id).await?;
            debug!("delete: emptied node {}, dropped", prev.node_id);
            return Ok(());
        }

        if let Some(next) = located.next {
            let next_size = self.node_ops.size(next.node_id).await?;
            if prev_size + next_size < self.config.batch_size {
                let names = self.node_ops.range_after(next.node_id, None).await?;
                self.node_ops.add_all(prev.node_id, &names).await?;
                self.skip_list.delete_by_key(&next.key).await?;
                self.node_ops.drop(next.node_id).await?;
                debug!("delete: merged node {} into {}", next.node_id, prev.node_id);
            }
        }

        Ok(())
    }

    async fn scan_inner(&self, from: &[u8], visit: &mut dyn FnMut(&Name) -> bool) -> Result<()> {
        let located = self.skip_list.find_greater_or_equal(from).await?;
        let prev = if located.next.as_ref().map(|e| e.key == from).unwrap_or(false) {
            None
        } else {
            located.prev.clone()
        };
        let from_opt: Option<&[u8]> = if from.is_empty() { None } else { Some(from) };

        let mut deliver = |raw: &[u8]| -> bool {
            match Name::new(raw.to_vec()) {
                Ok(name) => visit(&name),
                Err(e) => {
                    warn!("scan: skipping unreadable name: {e}");
                    true
                }
            }
        };

        if let Some(p) = prev {
            let keep_going = self.node_ops.scan_from(p.node_id, from_opt, &mut deliver).await?;
            if !keep_going {
                return Ok(());
            }
        }

        let mut current = located.next;
        while let Some(node) = current {
            let keep_going = self
                .node_ops
                .scan_from(node.node_id, from_opt, &mut deliver)
                .await?;
            if !keep_going {
                return Ok(());
            }
            current = self.skip_list.next_after(&node.key).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip_list::InMemorySkipList;
    use crate::sorted_batch_store::InMemorySortedBatchStore;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn name(s: &str) -> Name {
        Name::new(s.as_bytes().to_vec()).unwrap()
    }

    async fn build(batch_size: usize) -> ItemList {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = IndexConfig::new(b"t:".to_vec(), batch_size).unwrap();
        let skip_list = Arc::new(InMemorySkipList::new());
        let store = Arc::new(InMemorySortedBatchStore::new());
        ItemList::new(config, skip_list, store)
    }

    async fn scan_all(list: &ItemList) -> Vec<String> {
        let mut out = Vec::new();
        list.scan(b"", |n| {
            out.push(n.to_string());
            true
        })
        .await
        .unwrap();
        out
    }

    #[tokio::test]
    async fn sequential_fill_b3() {
        let list = build(3).await;
        for n in ["a", "b", "c", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn reverse_fill_b3() {
        let list = build(3).await;
        for n in ["e", "d", "c", "b", "a"] {
            list.insert(name(n)).await.unwrap();
        }
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn interior_degenerate_split_b3() {
        let list = build(3).await;
        for n in ["a", "b", "c", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        list.insert(name("cc")).await.unwrap();
        assert_eq!(
            scan_all(&list).await,
            vec!["a", "b", "c", "cc", "d", "e"]
        );
    }

    #[tokio::test]
    async fn true_split_b4() {
        let list = build(4).await;
        for n in ["a", "b", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        list.insert(name("c")).await.unwrap();
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn left_heavy_split_rekeys_old_node_to_new_minimum() {
        // Regression test for an ambiguity in the split description: the
        // old node must be re-keyed to the minimum of what it actually
        // retains, not to the inserted name (see DESIGN.md).
        let list = build(4).await;
        for n in ["a", "b", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        list.insert(name("c")).await.unwrap();
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c", "d", "e"]);

        // A subsequent insert must locate neighbors correctly, which only
        // holds if the old node's leading key tracks its true minimum "d".
        list.insert(name("cc")).await.unwrap();
        assert_eq!(
            scan_all(&list).await,
            vec!["a", "b", "c", "cc", "d", "e"]
        );

        list.delete(b"d").await.unwrap();
        assert_eq!(
            scan_all(&list).await,
            vec!["a", "b", "c", "cc", "e"]
        );
    }

    #[tokio::test]
    async fn delete_with_merge_b4() {
        let list = build(4).await;
        // Fill node "a" to its bound, force a degenerate split off "e", then
        // shrink "a" by deletion until it is small enough to absorb "e"'s
        // node in full: (a:{a,d}) + (e:{e,f}) -> merge -> (a:{a,e,f}).
        for n in ["a", "b", "c", "d", "e", "f"] {
            list.insert(name(n)).await.unwrap();
        }
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c", "d", "e", "f"]);

        list.delete(b"b").await.unwrap();
        list.delete(b"c").await.unwrap();
        // Still no merge: sizes are 2 ("a","d") and 2 ("e","f"), and 2+2
        // is not strictly less than B=4.
        assert_eq!(scan_all(&list).await, vec!["a", "d", "e", "f"]);

        list.delete(b"d").await.unwrap();
        // Now 1 + 2 < 4: merging "e"'s node into "a"'s is triggered.
        assert_eq!(scan_all(&list).await, vec!["a", "e", "f"]);
    }

    #[tokio::test]
    async fn delete_leading_key_rekeys() {
        let list = build(3).await;
        for n in ["a", "b", "c"] {
            list.insert(name(n)).await.unwrap();
        }
        list.delete(b"a").await.unwrap();
        assert_eq!(scan_all(&list).await, vec!["b", "c"]);
        // the node should now be keyed by "b"; inserting "a" again should
        // create a brand-new node rather than landing inside the old batch.
        list.insert(name("a")).await.unwrap();
        assert_eq!(scan_all(&list).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let list = build(3).await;
        list.insert(name("m")).await.unwrap();
        list.insert(name("m")).await.unwrap();
        assert_eq!(scan_all(&list).await, vec!["m"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let list = build(3).await;
        list.insert(name("m")).await.unwrap();
        list.delete(b"m").await.unwrap();
        list.delete(b"m").await.unwrap();
        assert_eq!(scan_all(&list).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn ranged_scan_yields_suffix() {
        let list = build(2).await;
        for n in ["a", "b", "c", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        let mut out = Vec::new();
        list.scan(b"c", |n| {
            out.push(n.to_string());
            true
        })
        .await
        .unwrap();
        assert_eq!(out, vec!["c", "d", "e"]);
    }

    #[tokio::test]
    async fn scan_halts_when_visitor_returns_false() {
        let list = build(2).await;
        for n in ["a", "b", "c", "d", "e"] {
            list.insert(name(n)).await.unwrap();
        }
        let mut out = Vec::new();
        list.scan(b"", |n| {
            out.push(n.to_string());
            out.len() < 2
        })
        .await
        .unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn drop_all_empties_the_index() {
        let list = build(2).await;
        for n in ["a", "b", "c", "d"] {
            list.insert(name(n)).await.unwrap();
        }
        list.drop_all().await.unwrap();
        assert_eq!(scan_all(&list).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn reentrant_use_is_rejected() {
        let list = build(3).await;
        let _guard = list.enter().unwrap();
        let err = list.insert(name("a")).await.unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// P1/P2/P3/P6: after a random sequence of inserts and deletes
        /// against a reference `BTreeSet`, a full scan must match the
        /// reference set exactly and in order, and no live batch may
        /// exceed the configured bound.
        #[test]
        fn matches_reference_set(
            batch_size in 2usize..6,
            ops in proptest::collection::vec(
                (proptest::bool::ANY, "[a-e]{1,3}"),
                1..40,
            ),
        ) {
            tokio::runtime::Runtime::new().unwrap().block_on(async {
                let list = build(batch_size).await;
                let mut reference: BTreeSet<String> = BTreeSet::new();

                for (is_insert, raw) in ops {
                    if is_insert {
                        list.insert(name(&raw)).await.unwrap();
                        reference.insert(raw);
                    } else {
                        list.delete(raw.as_bytes()).await.unwrap();
                        reference.remove(&raw);
                    }
                }

                let got = scan_all(&list).await;
                let expected: Vec<String> = reference.into_iter().collect();
                prop_assert_eq!(got, expected);
                Ok(())
            })?;
        }

        /// P5: inserting or deleting the same name twice in a row is
        /// equivalent to doing it once.
        #[test]
        fn repeat_insert_or_delete_is_idempotent(
            batch_size in 2usize..6,
            raw in "[a-e]{1,3}",
            second_is_delete in proptest::bool::ANY,
        ) {
            tokio::runtime::Runtime::new().unwrap().block_on(async {
                let once = build(batch_size).await;
                let twice = build(batch_size).await;

                once.insert(name(&raw)).await.unwrap();
                twice.insert(name(&raw)).await.unwrap();
                if second_is_delete {
                    once.delete(raw.as_bytes()).await.unwrap();
                    twice.delete(raw.as_bytes()).await.unwrap();
                    twice.delete(raw.as_bytes()).await.unwrap();
                } else {
                    twice.insert(name(&raw)).await.unwrap();
                }

                prop_assert_eq!(scan_all(&once).await, scan_all(&twice).await);
                Ok(())
            })?;
        }
    }
}
