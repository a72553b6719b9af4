//! Fan-out of a root policy into per-cluster leafs.

use itertools::Itertools;
use splitter_core::{Cluster, ComplianceHistory, DetailsPerTemplate, Policy, PolicyStatus};
use splitter_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::classify::leaf_name;
use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::types::SplitOutcome;

/// Build the leaf of `root` for `cluster`.
///
/// The leaf copies the root's labels, annotations and spec, is renamed to the
/// deterministic leaf name, is labelled with its cluster and owner, points an
/// owner reference at the root, and has its store identity cleared so the
/// store treats it as a new object.
pub fn build_leaf(root: &Policy, cluster: &Cluster, config: &ReconcilerConfig) -> Policy {
    let mut leaf = Policy::new(
        root.metadata.namespace.clone(),
        leaf_name(root.name(), &cluster.name, &config.leaf_separator),
    );

    leaf.metadata.labels = root.metadata.labels.clone();
    leaf.metadata
        .labels
        .insert(config.cluster_label.clone(), cluster.name.clone());
    leaf.metadata
        .labels
        .insert(config.owned_by_label.clone(), root.name().to_string());
    leaf.metadata.annotations = root.metadata.annotations.clone();
    leaf.metadata.owner_references =
        vec![root.owner_reference(config.owner_api_version.clone(), config.owner_kind.clone())];
    leaf.spec = root.spec.clone();
    leaf
}

/// Splits a root that has no leafs yet.
pub struct Splitter<'a> {
    store: &'a dyn ObjectStore,
    config: &'a ReconcilerConfig,
    cancel: &'a Cancellation,
}

impl<'a> Splitter<'a> {
    /// Create a splitter for one reconcile invocation.
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

    /// Split `root` across the registered clusters.
    ///
    /// The registry is listed fresh on every call and ordered by name.
    ///
    /// # Errors
    ///
    /// Returns any store failure other than `AlreadyExists` on leaf create.
    /// Leafs created before the failure are kept; a retry converges.
    pub async fn split(&self, root: &Policy) -> Result<SplitOutcome> {
        let clusters = self
            .cancel
            .guard("list clusters", self.store.list_clusters())
            .await?
            .into_iter()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect_vec();

        debug!(root = %root.key(), clusters = clusters.len(), "Splitting root");

        match clusters.as_slice() {
            [] => self.report_no_clusters(root).await,
            [only] => self.place(root, only).await,
            many => self.fan_out(root, many).await,
        }
    }

    async fn report_no_clusters(&self, root: &Policy) -> Result<SplitOutcome> {
        let message = self.config.no_clusters_message.as_str();

        if root.status.history_messages().any(|m| m == message) {
            debug!(root = %root.key(), "No clusters already reported");
            return Ok(SplitOutcome::NoClusters { reported: false });
        }

        let mut reported = root.clone();
        reported.status = PolicyStatus {
            details: vec![DetailsPerTemplate {
                history: vec![ComplianceHistory::now(message)],
                ..DetailsPerTemplate::default()
            }],
            ..root.status.clone()
        };

        self.cancel
            .guard("update status", self.store.update_status(reported))
            .await?;

        info!(root = %root.key(), "No clusters registered");
        Ok(SplitOutcome::NoClusters { reported: true })
    }

    async fn place(&self, root: &Policy, cluster: &Cluster) -> Result<SplitOutcome> {
        let mut placed = root.clone();
        placed
            .metadata
            .labels
            .insert(self.config.cluster_label.clone(), cluster.name.clone());

        // Skipping a no-op write keeps the root from re-triggering itself.
        if placed == *root {
            return Ok(SplitOutcome::Placed {
                cluster: cluster.name.clone(),
                updated: false,
            });
        }

        self.cancel
            .guard("update", self.store.update(placed))
            .await?;

        info!(root = %root.key(), cluster = %cluster.name, "Placed root on its only cluster");
        Ok(SplitOutcome::Placed {
            cluster: cluster.name.clone(),
            updated: true,
        })
    }

    async fn fan_out(&self, root: &Policy, clusters: &[Cluster]) -> Result<SplitOutcome> {
        let mut created = Vec::new();
        let mut existing = Vec::new();

        for cluster in clusters {
            let leaf = build_leaf(root, cluster, self.config);
            let name = leaf.metadata.name.clone();

            match self.cancel.guard("create", self.store.create(leaf)).await {
                Ok(_) => {
                    info!(leaf = %name, cluster = %cluster.name, "Created leaf");
                    created.push(name);
                }
                Err(e) if e.is_already_exists() => {
                    debug!(leaf = %name, "Leaf already exists");
                    existing.push(name);
                }
                Err(e) => {
                    warn!(leaf = %name, error = %e, "Failed to create leaf");
                    return Err(e);
                }
            }
        }

        Ok(SplitOutcome::FannedOut { created, existing })
    }
}
