//! Split-and-aggregate reconciliation for multi-cluster policies.
//!
//! A root policy is fanned out into one leaf per target cluster, and leaf
//! status is fanned back in onto the root.
//!
//! # Key Concepts
//!
//! ## Classification
//!
//! A policy without a cluster-assignment label is a **root**. Anything else
//! is a **leaf**, owned by the root named in its owned-by label.
//!
//! ## Splitting
//!
//! When a root has no leafs, the registered clusters are listed:
//!
//! - no clusters: the root's status records why nothing was placed
//! - one cluster: the root itself is labelled for that cluster
//! - more: one leaf named `<root>--<cluster>` is created per cluster
//!
//! ## Aggregation
//!
//! When a leaf changes, the root's status is recomputed from every sibling
//! leaf and written with optimistic concurrency. A conflict is retried from
//! scratch, never merged.
//!
//! # Example
//!
//! ```ignore
//! use splitter_core::{Cluster, ObjectKey, Policy};
//! use splitter_reconciler::{Cancellation, Reconciler};
//! use splitter_store::InMemoryObjectStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryObjectStore::new_arc();
//!     store.register_cluster(Cluster::new("c1")).await;
//!     store.register_cluster(Cluster::new("c2")).await;
//!     store.seed(Policy::new("default", "root")).await;
//!
//!     let reconciler = Reconciler::builder().with_store(store).build()?;
//!     let result = reconciler
//!         .reconcile(&ObjectKey::new("default", "root"), &Cancellation::never())
//!         .await;
//!     assert!(result.is_done());
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod aggregate;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod split;
pub mod types;

// Re-export main types
pub use aggregate::{Aggregator, aggregate_status};
pub use cancel::{Cancellation, CancellationSource};
pub use classify::{Role, classify, is_owned_by, leaf_name};
pub use config::ReconcilerConfig;
pub use error::{Error, Result};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use split::{Splitter, build_leaf};
pub use types::{AggregateOutcome, Outcome, ReconcileResult, SplitOutcome};
