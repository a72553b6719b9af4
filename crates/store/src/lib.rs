//! Object store interface for the policy splitter.
//!
//! The reconciler never talks to a concrete backend; it consumes the
//! [`ObjectStore`] trait:
//!
//! - **get / list**: read policies by key or by label selector
//! - **create**: new objects, rejecting duplicates with `AlreadyExists`
//! - **update / update_status**: version-checked writes that fail with `Conflict`
//! - **list_clusters**: the target cluster registry
//!
//! [`InMemoryObjectStore`] implements the same semantics in process, including
//! owner-reference cascade deletion, for tests and offline simulation.
//!
//! # Example
//!
//! ```ignore
//! use splitter_store::{InMemoryObjectStore, ObjectStore};
//! use splitter_core::{Cluster, Policy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryObjectStore::new();
//!     store.register_cluster(Cluster::new("c1")).await;
//!     let root = store.create(Policy::new("default", "root")).await.unwrap();
//!     println!("created {} at version {}", root.key(), root.metadata.resource_version);
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Error, Operation, Result};
pub use memory::InMemoryObjectStore;
pub use store::{ObjectStore, TracingObjectStore};
