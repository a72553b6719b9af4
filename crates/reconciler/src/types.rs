//! Core types for the reconciler.

use std::fmt;

use crate::error::Error;

/// What the splitter did for a root with no leafs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// No cluster is registered. `reported` is false when the root already
    /// carried the explanatory status message.
    NoClusters { reported: bool },
    /// Exactly one cluster: the root itself was labelled for it.
    Placed { cluster: String, updated: bool },
    /// One leaf per cluster, by leaf name.
    FannedOut {
        created: Vec<String>,
        existing: Vec<String>,
    },
}

/// What the aggregator did for a root's leaf set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// The recomputed status was written.
    Updated { leafs: usize },
    /// The root already carried the recomputed status.
    Unchanged { leafs: usize },
    /// The root no longer exists; its leafs are left to cascade deletion.
    OwnerGone,
}

/// Successful result of one reconcile invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The object no longer exists.
    Deleted,
    /// A root with no leafs was split.
    Split(SplitOutcome),
    /// A root that already has leafs. Splitting runs at most once.
    LeafsPresent { count: usize },
    /// A root already labelled for its only cluster. It carries the
    /// cluster label but no owner, and needs nothing further.
    AlreadyPlaced { cluster: String },
    /// A leaf changed and its root's status was recomputed.
    Aggregated(AggregateOutcome),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted => write!(f, "deleted"),
            Self::Split(SplitOutcome::NoClusters { reported }) => {
                write!(f, "no clusters (reported: {reported})")
            }
            Self::Split(SplitOutcome::Placed { cluster, updated }) => {
                write!(f, "placed on {cluster} (updated: {updated})")
            }
            Self::Split(SplitOutcome::FannedOut { created, existing }) => write!(
                f,
                "fanned out ({} created, {} existing)",
                created.len(),
                existing.len()
            ),
            Self::LeafsPresent { count } => write!(f, "{count} leafs present"),
            Self::AlreadyPlaced { cluster } => write!(f, "already placed on {cluster}"),
            Self::Aggregated(AggregateOutcome::Updated { leafs }) => {
                write!(f, "aggregated {leafs} leafs")
            }
            Self::Aggregated(AggregateOutcome::Unchanged { leafs }) => {
                write!(f, "aggregate of {leafs} leafs unchanged")
            }
            Self::Aggregated(AggregateOutcome::OwnerGone) => write!(f, "owner gone"),
        }
    }
}

/// Completion signal handed back to the invoking runtime.
#[derive(Debug, Clone)]
pub enum ReconcileResult {
    /// Finished; do not requeue.
    Done(Outcome),
    /// Failed in a way a later attempt may fix; requeue.
    Retry(Error),
    /// Failed on bad data; reported, not requeued.
    Terminal(Error),
}

impl ReconcileResult {
    /// Whether the runtime should requeue the object.
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Whether the reconcile finished without error.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The outcome, if the reconcile finished.
    pub const fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Done(outcome) => Some(outcome),
            Self::Retry(_) | Self::Terminal(_) => None,
        }
    }

    /// The error, if the reconcile failed.
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Done(_) => None,
            Self::Retry(e) | Self::Terminal(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitter_core::ObjectKey;

    #[test]
    fn test_retry_requeues() {
        let result = ReconcileResult::Retry(Error::cancelled("get"));
        assert!(result.should_retry());
        assert!(!result.is_done());
        assert!(result.error().is_some());
    }

    #[test]
    fn test_terminal_does_not_requeue() {
        let result = ReconcileResult::Terminal(Error::malformed_leaf(
            ObjectKey::new("default", "leaf"),
            "owned-by",
        ));
        assert!(!result.should_retry());
        assert!(result.outcome().is_none());
    }

    #[test]
    fn test_outcome_description() {
        let outcome = Outcome::Split(SplitOutcome::FannedOut {
            created: vec!["root--c1".to_string()],
            existing: vec!["root--c2".to_string()],
        });
        assert_eq!(outcome.to_string(), "fanned out (1 created, 1 existing)");
        assert!(ReconcileResult::Done(outcome).is_done());
    }
}
