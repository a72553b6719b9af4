//! Property-based tests for status aggregation using proptest.
//!
//! Properties verified:
//! - Listing order does not change the aggregate
//! - Aggregate sequences are exactly as long as the leaf sequences combined
//! - Prior root status never leaks into the recomputed status

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use proptest::prelude::*;
use splitter_core::{
    CLUSTER_LABEL, ComplianceState, CompliancePerClusterStatus, OWNED_BY_LABEL, ObjectKey,
    Placement, Policy, PolicyStatus,
};
use splitter_reconciler::{Aggregator, Cancellation, ReconcilerConfig, aggregate_status};
use splitter_store::{InMemoryObjectStore, ObjectStore};

fn state_strategy() -> impl Strategy<Value = ComplianceState> {
    prop_oneof![
        Just(ComplianceState::Compliant),
        Just(ComplianceState::NonCompliant),
        Just(ComplianceState::Pending),
    ]
}

/// A leaf's status as (placement rules, per-cluster states).
fn leaf_status_strategy() -> impl Strategy<Value = (Vec<String>, Vec<ComplianceState>)> {
    (
        prop::collection::vec("[a-z]{1,6}", 0..4),
        prop::collection::vec(state_strategy(), 0..4),
    )
}

fn build_leafs(specs: &[(Vec<String>, Vec<ComplianceState>)]) -> Vec<Policy> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (rules, states))| {
            let cluster = format!("c{i:02}");
            Policy::new("default", format!("root--{cluster}"))
                .with_label(CLUSTER_LABEL, cluster.clone())
                .with_label(OWNED_BY_LABEL, "root")
                .with_status(PolicyStatus {
                    placement: rules
                        .iter()
                        .map(|rule| Placement {
                            placement_binding: String::new(),
                            placement_rule: rule.clone(),
                        })
                        .collect(),
                    status: states
                        .iter()
                        .map(|state| CompliancePerClusterStatus::new(cluster.clone(), *state))
                        .collect(),
                    ..PolicyStatus::default()
                })
        })
        .collect()
}

proptest! {
    /// Property: any permutation of the leaf list aggregates identically.
    #[test]
    fn prop_aggregate_ignores_listing_order(
        (specs, shuffled) in prop::collection::vec(leaf_status_strategy(), 0..6)
            .prop_flat_map(|specs| {
                let indices: Vec<usize> = (0..specs.len()).collect();
                (Just(specs), Just(indices).prop_shuffle())
            }),
    ) {
        let leafs = build_leafs(&specs);
        let permuted: Vec<Policy> = shuffled.iter().map(|&i| leafs[i].clone()).collect();

        prop_assert_eq!(aggregate_status(&leafs), aggregate_status(&permuted));
    }

    /// Property: aggregate sequence lengths equal the sums over all leafs.
    #[test]
    fn prop_aggregate_lengths_are_sums(
        specs in prop::collection::vec(leaf_status_strategy(), 0..6),
    ) {
        let leafs = build_leafs(&specs);
        let status = aggregate_status(&leafs);

        let placements: usize = specs.iter().map(|(rules, _)| rules.len()).sum();
        let records: usize = specs.iter().map(|(_, states)| states.len()).sum();
        prop_assert_eq!(status.placement.len(), placements);
        prop_assert_eq!(status.status.len(), records);
        prop_assert!(status.details.is_empty());
    }

    /// Property: the aggregate compliance is set exactly when some leaf
    /// reports a state.
    #[test]
    fn prop_compliance_present_iff_any_record(
        specs in prop::collection::vec(leaf_status_strategy(), 0..6),
    ) {
        let status = aggregate_status(&build_leafs(&specs));
        let any_record = specs.iter().any(|(_, states)| !states.is_empty());

        prop_assert_eq!(status.compliant.is_some(), any_record);
    }

    /// Property: whatever the root carried before, the stored aggregate is
    /// exactly the recomputed one.
    #[test]
    fn prop_prior_root_status_is_discarded(
        specs in prop::collection::vec(leaf_status_strategy(), 1..5),
        prior in leaf_status_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().expect("runtime creation should succeed");
        let leafs = build_leafs(&specs);
        let expected = aggregate_status(&leafs);

        let stored = rt.block_on(async {
            let store = InMemoryObjectStore::new();
            let mut prior_root = build_leafs(&[prior]).remove(0);
            prior_root.metadata.name = "root".to_string();
            prior_root.metadata.labels.clear();
            store.seed(prior_root).await;
            for leaf in leafs {
                store.seed(leaf).await;
            }

            let config = ReconcilerConfig::default();
            let cancel = Cancellation::never();
            let owner = ObjectKey::new("default", "root");
            Aggregator::new(&store, &config, &cancel)
                .aggregate(&owner)
                .await
                .expect("aggregation should succeed");
            store.get(&owner).await.expect("root exists").status
        });

        prop_assert_eq!(stored, expected);
    }
}
