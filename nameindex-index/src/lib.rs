//! Ordered-name index
//!
//! This crate implements a batched, ordered index over a large mutable set
//! of byte-string names. It layers two external collaborators:
//!
//! - **SkipList**: an ordered map from leading key to node id.
//! - **SortedBatchStore**: an ordered set of names per node id.
//!
//! with the following components:
//!
//! - [`SkipList`] / [`SortedBatchStore`]: the collaborator traits, plus
//!   in-memory implementations for tests.
//! - [`NodeOps`]: a thin adaptor from a node id to sorted-batch operations.
//! - [`ItemList`]: the core. Coordinates skip-list key management with
//!   `NodeOps` to implement insert, delete, and ordered scan while keeping
//!   node counts small — each skip-list node batches up to `B` names, so the
//!   skip list indexes roughly `ceil(N/B)` entries rather than `N`.
//!
//! # Architecture
//!
//! ```text
//! ItemList::insert/delete/scan
//!        │
//!        ├── SkipList                    (leading key → node id)
//!        └── NodeOps → SortedBatchStore   (node id → batch of names)
//! ```
//!
//! # Example
//!
//! ```
//! use nameindex_index::{ItemList, IndexConfig, InMemorySkipList, InMemorySortedBatchStore};
//! use nameindex_core::Name;
//! use std::sync::Arc;
//!
//! # async fn run() -> nameindex_core::Result<()> {
//! let config = IndexConfig::new(b"idx:".to_vec(), 64)?;
//! let skip_list = Arc::new(InMemorySkipList::new());
//! let store = Arc::new(InMemorySortedBatchStore::new());
//! let index = ItemList::new(config, skip_list, store);
//!
//! index.insert(Name::new(b"alice".to_vec())?).await?;
//! index.insert(Name::new(b"bob".to_vec())?).await?;
//!
//! let mut names = Vec::new();
//! index.scan(b"", |n| { names.push(n.to_string()); true }).await?;
//! assert_eq!(names, vec!["alice", "bob"]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod item_list;
pub mod node_ops;
pub mod skip_list;
pub mod sorted_batch_store;

pub use config::IndexConfig;
pub use item_list::ItemList;
pub use node_ops::NodeOps;
pub use skip_list::{FindResult, InMemorySkipList, SkipList, SkipListEntry};
pub use sorted_batch_store::{InMemorySortedBatchStore, SortedBatchStore};
