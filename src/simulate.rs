//! Offline simulation: drive the reconciler against an in-memory store until
//! the world stops changing.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use splitter_core::{LabelSelector, Policy};
use splitter_reconciler::{Cancellation, ReconcileResult, Reconciler, ReconcilerConfig};
use splitter_store::{InMemoryObjectStore, ObjectStore, TracingObjectStore};
use tracing::{Instrument, info, info_span, warn};

use crate::fixture::Fixture;

/// Stage of the simulation a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Converging the seeded fixture.
    Seed,
    /// Converging after status reports.
    Reports,
    /// Converging after deletions.
    Deletions,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed => write!(f, "seed"),
            Self::Reports => write!(f, "reports"),
            Self::Deletions => write!(f, "deletions"),
        }
    }
}

/// One reconcile of every object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub phase: Phase,
    pub pass: usize,
    pub reconciled: usize,
    pub done: usize,
    pub retried: usize,
    pub terminal: usize,
    pub writes: u64,
}

impl PassSummary {
    /// A pass that wrote nothing and asked for no retry.
    pub const fn is_quiet(&self) -> bool {
        self.writes == 0 && self.retried == 0
    }
}

/// Outcome of a whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// Whether every phase reached a quiet pass within the pass limit.
    pub converged: bool,
    pub passes: Vec<PassSummary>,
    /// Final store contents in key order.
    pub objects: Vec<Policy>,
}

impl SimulationReport {
    /// Keep only the final objects whose labels match `selector`.
    pub fn retain_matching(&mut self, selector: &LabelSelector) {
        self.objects
            .retain(|policy| selector.matches(&policy.metadata.labels));
    }
}

/// Drives reconciles over an in-memory store.
pub struct Simulator {
    store: Arc<InMemoryObjectStore>,
    reconciler: Reconciler,
    max_passes: usize,
}

impl Simulator {
    /// Build a simulator over an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(config: ReconcilerConfig, max_passes: usize) -> Result<Self> {
        let store = InMemoryObjectStore::new_arc();
        let traced: Arc<dyn ObjectStore> = Arc::new(TracingObjectStore::new(store.clone()));
        let reconciler = Reconciler::builder()
            .with_store(traced)
            .with_config(config)
            .build()
            .context("Invalid reconciler configuration")?;

        Ok(Self {
            store,
            reconciler,
            max_passes,
        })
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<InMemoryObjectStore> {
        &self.store
    }

    /// Seed `fixture`, then converge, apply its reports, converge, apply its
    /// deletions and converge again.
    ///
    /// # Errors
    ///
    /// Returns an error if a report or deletion targets a missing object.
    pub async fn run(&self, fixture: Fixture, cancel: &Cancellation) -> Result<SimulationReport> {
        for cluster in fixture.clusters {
            self.store.register_cluster(cluster).await;
        }
        for policy in fixture.policies {
            self.store.seed(policy).await;
        }

        let mut passes = Vec::new();
        let mut converged = self.converge(Phase::Seed, cancel, &mut passes).await;

        if !fixture.reports.is_empty() {
            for report in fixture.reports {
                let key = report.key();
                let mut policy = self
                    .store
                    .get(&key)
                    .await
                    .with_context(|| format!("Status report targets missing policy {key}"))?;
                policy.status = report.status;
                self.store
                    .update_status(policy)
                    .await
                    .with_context(|| format!("Failed to apply status report to {key}"))?;
            }
            converged &= self.converge(Phase::Reports, cancel, &mut passes).await;
        }

        if !fixture.deletions.is_empty() {
            for key in &fixture.deletions {
                let removed = self
                    .store
                    .delete(key)
                    .await
                    .with_context(|| format!("Failed to delete {key}"))?;
                info!(key = %key, removed = removed.len(), "Deleted");
            }
            converged &= self.converge(Phase::Deletions, cancel, &mut passes).await;
        }

        Ok(SimulationReport {
            converged,
            passes,
            objects: self.store.objects().await,
        })
    }

    /// Run passes until one is quiet. Returns false if the pass limit or
    /// cancellation stops it first.
    async fn converge(
        &self,
        phase: Phase,
        cancel: &Cancellation,
        passes: &mut Vec<PassSummary>,
    ) -> bool {
        for pass in 1..=self.max_passes {
            if cancel.is_cancelled() {
                warn!(%phase, "Simulation cancelled");
                return false;
            }

            let summary = self
                .pass(phase, pass, cancel)
                .instrument(info_span!("pass", %phase, pass))
                .await;
            let quiet = summary.is_quiet();
            passes.push(summary);

            if quiet {
                info!(%phase, passes = pass, "Converged");
                return true;
            }
        }

        warn!(%phase, max_passes = self.max_passes, "Did not converge");
        false
    }

    async fn pass(&self, phase: Phase, pass: usize, cancel: &Cancellation) -> PassSummary {
        let keys = self.store.keys().await;
        let writes_before = self.store.writes();

        let results = join_all(keys.iter().map(|key| self.reconciler.reconcile(key, cancel))).await;

        let count = |f: fn(&ReconcileResult) -> bool| results.iter().filter(|r| f(r)).count();
        PassSummary {
            phase,
            pass,
            reconciled: results.len(),
            done: count(ReconcileResult::is_done),
            retried: count(ReconcileResult::should_retry),
            terminal: count(|r| matches!(r, ReconcileResult::Terminal(_))),
            writes: self.store.writes().saturating_sub(writes_before),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;
    use splitter_core::Cluster;
    use splitter_store::{Error as StoreError, Operation};

    fn fixture(clusters: &[&str]) -> Fixture {
        Fixture {
            clusters: clusters.iter().map(|c| Cluster::new(*c)).collect(),
            policies: vec![Policy::new("default", "root")],
            ..Fixture::default()
        }
    }

    #[tokio::test]
    async fn test_zero_cluster_fixture_converges() {
        let simulator = Simulator::new(ReconcilerConfig::default(), 5).expect("valid config");

        let report = simulator
            .run(fixture(&[]), &Cancellation::never())
            .await
            .expect("simulation runs");

        assert!(report.converged);
        assert_eq!(report.objects.len(), 1);
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0].writes, 1);
        assert!(report.passes[1].is_quiet());
    }

    #[tokio::test]
    async fn should_stop_at_pass_limit() {
        let simulator = Simulator::new(ReconcilerConfig::default(), 1).expect("valid config");
        simulator
            .store()
            .inject_failure(
                Operation::ListClusters,
                StoreError::unavailable(Operation::ListClusters, "registry down"),
            )
            .await;

        let report = simulator
            .run(fixture(&["c1", "c2"]), &Cancellation::never())
            .await
            .expect("simulation runs");

        assert!(!report.converged);
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.passes[0].retried, 1);
    }

    #[tokio::test]
    async fn should_stop_when_cancelled() {
        let simulator = Simulator::new(ReconcilerConfig::default(), 5).expect("valid config");
        let source = splitter_reconciler::CancellationSource::new();
        source.cancel();

        let report = simulator
            .run(fixture(&["c1"]), &source.token())
            .await
            .expect("simulation runs");

        assert!(!report.converged);
        assert!(report.passes.is_empty());
    }

    #[tokio::test]
    async fn should_fail_on_report_for_missing_policy() {
        let simulator = Simulator::new(ReconcilerConfig::default(), 5).expect("valid config");
        let mut fixture = fixture(&[]);
        fixture.reports.push(crate::fixture::StatusReport {
            namespace: "default".to_string(),
            name: "missing".to_string(),
            status: splitter_core::PolicyStatus::default(),
        });

        let result = simulator.run(fixture, &Cancellation::never()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_filter_report_by_selector() {
        let simulator = Simulator::new(ReconcilerConfig::default(), 5).expect("valid config");
        let mut report = simulator
            .run(fixture(&["c1", "c2"]), &Cancellation::never())
            .await
            .expect("simulation runs");
        assert_eq!(report.objects.len(), 3);

        let selector: LabelSelector = "kcp.dev/owned-by=root".parse().expect("valid selector");
        report.retain_matching(&selector);

        let names: Vec<&str> = report.objects.iter().map(Policy::name).collect();
        assert_eq!(names, vec!["root--c1", "root--c2"]);
    }

    #[test]
    fn should_reject_invalid_config() {
        let config = ReconcilerConfig::default().with_cluster_label("");
        assert!(Simulator::new(config, 5).is_err());
    }

    #[test]
    fn test_pass_quietness() {
        let summary = PassSummary {
            phase: Phase::Seed,
            pass: 1,
            reconciled: 3,
            done: 3,
            retried: 0,
            terminal: 0,
            writes: 0,
        };
        assert!(summary.is_quiet());
        assert!(!PassSummary { writes: 1, ..summary }.is_quiet());
    }
}
