//! Fan-in of leaf status onto the owning root.
//!
//! The root's status is always recomputed from the current leaf set and
//! never accumulated from its previous value. Appending to the old status
//! would grow it without bound across repeated reconciles.

use itertools::Itertools;
use splitter_core::{ComplianceState, ObjectKey, Policy, PolicyStatus};
use splitter_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::classify::is_owned_by;
use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::types::AggregateOutcome;

/// Recompute a root status from its leafs.
///
/// Leafs are ordered by key, so the result does not depend on listing order.
/// Placement and per-cluster status are the in-order concatenations of every
/// leaf's sequences; the compliance state is derived from the per-cluster
/// records. Details start empty.
pub fn aggregate_status(leafs: &[Policy]) -> PolicyStatus {
    let ordered = leafs
        .iter()
        .sorted_by(|a, b| {
            (&a.metadata.namespace, &a.metadata.name)
                .cmp(&(&b.metadata.namespace, &b.metadata.name))
        })
        .collect_vec();

    let placement = ordered
        .iter()
        .flat_map(|leaf| leaf.status.placement.iter().cloned())
        .collect_vec();
    let status = ordered
        .iter()
        .flat_map(|leaf| leaf.status.status.iter().cloned())
        .collect_vec();
    let compliant = ComplianceState::aggregate(status.iter().filter_map(|s| s.compliant));

    PolicyStatus {
        placement,
        status,
        compliant,
        details: Vec::new(),
    }
}

/// Recomputes a root's status when one of its leafs changes.
pub struct Aggregator<'a> {
    store: &'a dyn ObjectStore,
    config: &'a ReconcilerConfig,
    cancel: &'a Cancellation,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator for one reconcile invocation.
    pub const fn new(
        store: &'a dyn ObjectStore,
        config: &'a ReconcilerConfig,
        cancel: &'a Cancellation,
    ) -> Self {
        Self {
            store,
            config,
            cancel,
        }
    }

    /// Aggregate every leaf owned by `owner` onto the root `owner`.
    ///
    /// # Errors
    ///
    /// Any store failure is returned as-is. A conflict on the status write
    /// means the whole aggregation must be re-run; it is never patched.
    pub async fn aggregate(&self, owner: &ObjectKey) -> Result<AggregateOutcome> {
        let leafs = self
            .cancel
            .guard(
                "list leafs",
                self.store
                    .list(&owner.namespace, &self.config.leafs_of(&owner.name)),
            )
            .await?
            .into_iter()
            .filter(|policy| is_owned_by(policy, &owner.name, self.config))
            .collect_vec();

        let root = match self.cancel.guard("get root", self.store.get(owner)).await {
            Ok(root) => root,
            Err(e) if e.is_not_found() => {
                debug!(root = %owner, "Root gone, leafs left to cascade deletion");
                return Ok(AggregateOutcome::OwnerGone);
            }
            Err(e) => return Err(e),
        };

        let status = aggregate_status(&leafs);
        if status == root.status {
            debug!(root = %owner, leafs = leafs.len(), "Aggregate unchanged");
            return Ok(AggregateOutcome::Unchanged { leafs: leafs.len() });
        }

        let updated = Policy { status, ..root };
        match self
            .cancel
            .guard("update root status", self.store.update_status(updated))
            .await
        {
            Ok(_) => {
                info!(root = %owner, leafs = leafs.len(), "Aggregated leaf status");
                Ok(AggregateOutcome::Updated { leafs: leafs.len() })
            }
            Err(e) => {
                if e.is_conflict() {
                    debug!(root = %owner, "Root changed during aggregation");
                } else {
                    warn!(root = %owner, error = %e, "Failed to update root status");
                }
                Err(e)
            }
        }
    }
}
