//! Core data model for the policy splitter.
//!
//! A single root [`Policy`] is fanned out into one leaf per target
//! [`Cluster`]; leaf status is fanned back in onto the root. This crate holds
//! the shared vocabulary:
//!
//! - **Policy**: metadata, spec and compliance status
//! - **Cluster**: registry entries naming fan-out destinations
//! - **ObjectKey**: namespaced identifiers
//! - **LabelSelector**: equality predicates over the protocol labels

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cluster;
pub mod error;
pub mod key;
pub mod labels;
pub mod policy;

pub use cluster::Cluster;
pub use error::{Error, Result};
pub use key::ObjectKey;
pub use labels::{CLUSTER_LABEL, LabelSelector, Labels, OWNED_BY_LABEL};
pub use policy::{
    ComplianceHistory, CompliancePerClusterStatus, ComplianceState, DetailsPerTemplate,
    ObjectMeta, OwnerReference, Placement, Policy, PolicySpec, PolicyStatus, RemediationAction,
};
