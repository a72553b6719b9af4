//! Reconcile entry point.

use std::sync::Arc;

use splitter_core::{ObjectKey, Policy};
use splitter_store::ObjectStore;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::aggregate::Aggregator;
use crate::cancel::Cancellation;
use crate::classify::{Role, classify};
use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::split::Splitter;
use crate::types::{Outcome, ReconcileResult};

/// Split-and-aggregate reconciler for policies.
///
/// One instance serves any number of concurrent reconcile invocations. It
/// holds no per-object state; every decision is made from a fresh read of
/// the store.
///
/// Every invocation runs inside a `reconcile` span parented on the span the
/// reconciler was built with, so the host controller decides where its
/// events land.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    config: ReconcilerConfig,
    span: Span,
}

impl Reconciler {
    /// Create a new reconciler whose events are recorded under `span`.
    pub fn new(store: Arc<dyn ObjectStore>, config: ReconcilerConfig, span: Span) -> Self {
        Self {
            store,
            config,
            span,
        }
    }

    /// Start building a reconciler.
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    /// The active configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reconcile the object at `key`.
    ///
    /// Never panics and never returns a bare error: every failure is mapped
    /// onto [`ReconcileResult::Retry`] or [`ReconcileResult::Terminal`].
    pub async fn reconcile(&self, key: &ObjectKey, cancel: &Cancellation) -> ReconcileResult {
        let span = info_span!(parent: &self.span, "reconcile", key = %key);

        async {
            debug!("Reconciling");

            match self.run(key, cancel).await {
                Ok(outcome) => {
                    info!(outcome = %outcome, "Reconcile complete");
                    ReconcileResult::Done(outcome)
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "Reconcile failed, will retry");
                    ReconcileResult::Retry(e)
                }
                Err(e) => {
                    error!(error = %e, "Reconcile failed on bad data");
                    ReconcileResult::Terminal(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, key: &ObjectKey, cancel: &Cancellation) -> Result<Outcome> {
        let policy = match cancel.guard("get", self.store.get(key)).await {
            Ok(policy) => policy,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "Object gone");
                return Ok(Outcome::Deleted);
            }
            Err(e) => return Err(e),
        };

        match classify(&policy, &self.config) {
            Role::Root => self.reconcile_root(&policy, cancel).await,
            Role::Leaf { owner } if owner.is_empty() => {
                if policy.metadata.owner_references.is_empty() {
                    let cluster = policy
                        .label(&self.config.cluster_label)
                        .unwrap_or_default()
                        .to_string();
                    debug!(cluster = %cluster, "Root already placed on its only cluster");
                    Ok(Outcome::AlreadyPlaced { cluster })
                } else {
                    Err(Error::malformed_leaf(
                        key.clone(),
                        self.config.owned_by_label.clone(),
                    ))
                }
            }
            Role::Leaf { owner } => {
                let owner = key.sibling(owner);
                Aggregator::new(self.store.as_ref(), &self.config, cancel)
                    .aggregate(&owner)
                    .await
                    .map(Outcome::Aggregated)
            }
        }
    }

    async fn reconcile_root(&self, root: &Policy, cancel: &Cancellation) -> Result<Outcome> {
        let leafs = cancel
            .guard(
                "list leafs",
                self.store.list(
                    &root.metadata.namespace,
                    &self.config.leafs_of(root.name()),
                ),
            )
            .await?;

        if !leafs.is_empty() {
            debug!(root = %root.key(), leafs = leafs.len(), "Root already split");
            return Ok(Outcome::LeafsPresent { count: leafs.len() });
        }

        Splitter::new(self.store.as_ref(), &self.config, cancel)
            .split(root)
            .await
            .map(Outcome::Split)
    }
}

/// Builder for [`Reconciler`].
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    config: ReconcilerConfig,
    span: Option<Span>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            config: ReconcilerConfig::default(),
            span: None,
        }
    }

    /// Set the object store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the parent span for reconcile events. Defaults to the span
    /// current at [`build`](Self::build).
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no store was set or the
    /// configuration does not validate.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("object store is required"))?;
        self.config.validate()?;
        let span = self.span.unwrap_or_else(Span::current);
        Ok(Reconciler::new(store, self.config, span))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::Mutex;

    use super::*;
    use crate::types::{AggregateOutcome, SplitOutcome};
    use splitter_core::{CLUSTER_LABEL, Cluster, OWNED_BY_LABEL};
    use splitter_store::InMemoryObjectStore;
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    fn setup_reconciler() -> (Reconciler, Arc<InMemoryObjectStore>) {
        let store = InMemoryObjectStore::new_arc();
        let reconciler = Reconciler::new(
            store.clone(),
            ReconcilerConfig::default(),
            Span::current(),
        );
        (reconciler, store)
    }

    /// Records, for every event, the names of its enclosing spans from the
    /// root down.
    #[derive(Clone, Default)]
    struct ScopeRecorder {
        scopes: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl<S> Layer<S> for ScopeRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let scope = ctx
                .event_scope(event)
                .map(|scope| {
                    scope
                        .from_root()
                        .map(|span| span.name().to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            self.scopes.lock().unwrap().push(scope);
        }
    }

    #[tokio::test]
    async fn test_reconcile_missing_object() {
        let (reconciler, store) = setup_reconciler();

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "root"), &Cancellation::never())
            .await;

        assert_eq!(result.outcome(), Some(&Outcome::Deleted));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_root_splits_once() {
        let (reconciler, store) = setup_reconciler();
        store.register_cluster(Cluster::new("c1")).await;
        store.register_cluster(Cluster::new("c2")).await;
        store.seed(Policy::new("default", "root")).await;
        let key = ObjectKey::new("default", "root");

        let first = reconciler.reconcile(&key, &Cancellation::never()).await;
        let second = reconciler.reconcile(&key, &Cancellation::never()).await;

        assert!(matches!(
            first.outcome(),
            Some(Outcome::Split(SplitOutcome::FannedOut { .. }))
        ));
        assert_eq!(second.outcome(), Some(&Outcome::LeafsPresent { count: 2 }));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_leaf_aggregates_owner() {
        let (reconciler, store) = setup_reconciler();
        store.seed(Policy::new("default", "root")).await;
        store
            .seed(
                Policy::new("default", "root--c1")
                    .with_label(CLUSTER_LABEL, "c1")
                    .with_label(OWNED_BY_LABEL, "root"),
            )
            .await;

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "root--c1"), &Cancellation::never())
            .await;

        assert_eq!(
            result.outcome(),
            Some(&Outcome::Aggregated(AggregateOutcome::Unchanged { leafs: 1 }))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn should_record_events_under_injected_span() {
        let recorder = ScopeRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = InMemoryObjectStore::new_arc();
        store.seed(Policy::new("default", "root")).await;
        let reconciler = Reconciler::builder()
            .with_store(store)
            .with_span(info_span!("controller"))
            .build()
            .unwrap();

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "root"), &Cancellation::never())
            .await;

        assert!(result.is_done());
        let scopes = recorder.scopes.lock().unwrap().clone();
        let reconcile_scopes: Vec<_> = scopes
            .iter()
            .filter(|scope| scope.iter().any(|name| name == "reconcile"))
            .collect();
        assert!(
            reconcile_scopes.len() >= 2,
            "entry and completion events should be recorded: {scopes:?}"
        );
        assert!(
            reconcile_scopes
                .iter()
                .all(|scope| scope.first().map(String::as_str) == Some("controller")),
            "reconcile events should sit under the injected span: {scopes:?}"
        );
    }

    #[tokio::test]
    async fn should_treat_placed_root_as_already_placed() {
        let (reconciler, store) = setup_reconciler();
        store
            .seed(Policy::new("default", "root").with_label(CLUSTER_LABEL, "c1"))
            .await;

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "root"), &Cancellation::never())
            .await;

        assert_eq!(
            result.outcome(),
            Some(&Outcome::AlreadyPlaced {
                cluster: "c1".to_string()
            })
        );
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn should_reject_leaf_without_owner() {
        let (reconciler, store) = setup_reconciler();
        let root = Policy::new("default", "root");
        let mut orphan = Policy::new("default", "orphan").with_label(CLUSTER_LABEL, "c1");
        orphan
            .metadata
            .owner_references
            .push(root.owner_reference("policy.open-cluster-management.io/v1", "Policy"));
        store.seed(orphan).await;

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "orphan"), &Cancellation::never())
            .await;

        assert!(matches!(
            result,
            ReconcileResult::Terminal(Error::MalformedLeaf { .. })
        ));
        assert!(!result.should_retry());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn should_retry_when_cancelled() {
        let (reconciler, store) = setup_reconciler();
        store.seed(Policy::new("default", "root")).await;
        let source = crate::cancel::CancellationSource::new();
        source.cancel();

        let result = reconciler
            .reconcile(&ObjectKey::new("default", "root"), &source.token())
            .await;

        assert!(result.should_retry());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_builder() {
        let store = InMemoryObjectStore::new_arc();

        let result = ReconcilerBuilder::new()
            .with_store(store)
            .with_config(ReconcilerConfig::default().with_leaf_separator("."))
            .build();

        assert_eq!(
            result.ok().map(|r| r.config().leaf_separator.clone()),
            Some(".".to_string())
        );
    }

    #[test]
    fn should_require_store() {
        let result = Reconciler::builder().build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn should_reject_invalid_config() {
        let result = Reconciler::builder()
            .with_store(InMemoryObjectStore::new_arc())
            .with_config(ReconcilerConfig::default().with_leaf_separator(""))
            .build();

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
