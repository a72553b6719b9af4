//! Root/leaf classification.

use splitter_core::Policy;

use crate::config::ReconcilerConfig;

/// Role of a policy in the split-and-aggregate protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Source of truth for the spec and target of aggregated status.
    Root,
    /// Per-cluster copy. `owner` is empty when the owned-by label is missing.
    /// Without owner references that is a root placed on its only cluster;
    /// with them it is a malformed leaf.
    Leaf { owner: String },
}

/// Classify a policy by its labels.
///
/// An absent or empty cluster-assignment label makes a root; anything else is
/// a leaf owned by the root named in the owned-by label.
pub fn classify(policy: &Policy, config: &ReconcilerConfig) -> Role {
    match policy.label(&config.cluster_label) {
        None | Some("") => Role::Root,
        Some(_) => Role::Leaf {
            owner: policy
                .label(&config.owned_by_label)
                .unwrap_or_default()
                .to_string(),
        },
    }
}

/// Whether `policy` is a leaf of the root named `root`.
pub fn is_owned_by(policy: &Policy, root: &str, config: &ReconcilerConfig) -> bool {
    matches!(classify(policy, config), Role::Leaf { owner } if owner == root)
}

/// Deterministic leaf name, so repeated creates collide instead of
/// duplicating.
pub fn leaf_name(root: &str, cluster: &str, separator: &str) -> String {
    format!("{root}{separator}{cluster}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitter_core::{CLUSTER_LABEL, OWNED_BY_LABEL};

    fn config() -> ReconcilerConfig {
        ReconcilerConfig::default()
    }

    #[test]
    fn test_unlabelled_policy_is_root() {
        let policy = Policy::new("default", "root");
        assert_eq!(classify(&policy, &config()), Role::Root);
    }

    #[test]
    fn test_empty_cluster_label_is_root() {
        let policy = Policy::new("default", "root").with_label(CLUSTER_LABEL, "");
        assert_eq!(classify(&policy, &config()), Role::Root);
    }

    #[test]
    fn test_owned_by_alone_does_not_make_a_leaf() {
        let policy = Policy::new("default", "root").with_label(OWNED_BY_LABEL, "other");
        assert_eq!(classify(&policy, &config()), Role::Root);
    }

    #[test]
    fn test_labelled_policy_is_leaf_of_owner() {
        let policy = Policy::new("default", "root--c1")
            .with_label(CLUSTER_LABEL, "c1")
            .with_label(OWNED_BY_LABEL, "root");

        assert_eq!(
            classify(&policy, &config()),
            Role::Leaf {
                owner: "root".to_string()
            }
        );
    }

    #[test]
    fn should_report_empty_owner_for_leaf_without_owned_by() {
        let policy = Policy::new("default", "root").with_label(CLUSTER_LABEL, "c1");

        assert_eq!(
            classify(&policy, &config()),
            Role::Leaf {
                owner: String::new()
            }
        );
    }

    #[test]
    fn should_honor_configured_label_keys() {
        let config = ReconcilerConfig::default()
            .with_cluster_label("example.dev/cluster")
            .with_owned_by_label("example.dev/owner");
        let policy = Policy::new("default", "root--c1")
            .with_label(CLUSTER_LABEL, "c1")
            .with_label("example.dev/cluster", "c1")
            .with_label("example.dev/owner", "root");

        assert_eq!(
            classify(&policy, &config),
            Role::Leaf {
                owner: "root".to_string()
            }
        );
    }

    #[test]
    fn test_is_owned_by() {
        let leaf = Policy::new("default", "root--c1")
            .with_label(CLUSTER_LABEL, "c1")
            .with_label(OWNED_BY_LABEL, "root");
        let unplaced = Policy::new("default", "copy").with_label(OWNED_BY_LABEL, "root");

        assert!(is_owned_by(&leaf, "root", &config()));
        assert!(!is_owned_by(&leaf, "other", &config()));
        assert!(!is_owned_by(&unplaced, "root", &config()));
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("root", "c1", "--"), "root--c1");
    }
}
