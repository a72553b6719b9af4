//! Object store trait and tracing wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use splitter_core::{Cluster, LabelSelector, ObjectKey, Policy};

use crate::error::Result;

/// Trait for policy storage backends.
///
/// Every call is all-or-nothing. `update` and `update_status` are
/// version-checked against `metadata.resource_version`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a policy by key.
    async fn get(&self, key: &ObjectKey) -> Result<Policy>;

    /// List policies in a namespace whose labels satisfy the selector.
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Policy>>;

    /// Create a new policy. The resource version must be empty.
    async fn create(&self, policy: Policy) -> Result<Policy>;

    /// Write metadata and spec. Status is left untouched.
    async fn update(&self, policy: Policy) -> Result<Policy>;

    /// Write status only.
    async fn update_status(&self, policy: Policy) -> Result<Policy>;

    /// List the target cluster registry.
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get(&self, key: &ObjectKey) -> Result<Policy> {
        (**self).get(key).await
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Policy>> {
        (**self).list(namespace, selector).await
    }

    async fn create(&self, policy: Policy) -> Result<Policy> {
        (**self).create(policy).await
    }

    async fn update(&self, policy: Policy) -> Result<Policy> {
        (**self).update(policy).await
    }

    async fn update_status(&self, policy: Policy) -> Result<Policy> {
        (**self).update_status(policy).await
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        (**self).list_clusters().await
    }
}

/// A wrapper that adds tracing to an object store.
pub struct TracingObjectStore<S: ObjectStore> {
    inner: S,
}

impl<S: ObjectStore> TracingObjectStore<S> {
    /// Create a new tracing object store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get the wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TracingObjectStore<S> {
    async fn get(&self, key: &ObjectKey) -> Result<Policy> {
        tracing::debug!(key = %key, "Getting policy");
        let result = self.inner.get(key).await;
        if let Err(ref e) = result {
            tracing::trace!(key = %key, error = %e, "Get failed");
        }
        result
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Policy>> {
        tracing::debug!(namespace, selector = %selector, "Listing policies");
        let result = self.inner.list(namespace, selector).await;
        if let Ok(ref items) = result {
            tracing::trace!(count = items.len(), "Policies listed");
        }
        result
    }

    async fn create(&self, policy: Policy) -> Result<Policy> {
        tracing::debug!(key = %policy.key(), "Creating policy");
        let result = self.inner.create(policy).await;
        if let Ok(ref created) = result {
            tracing::trace!(
                key = %created.key(),
                uid = %created.metadata.uid,
                "Policy created"
            );
        }
        result
    }

    async fn update(&self, policy: Policy) -> Result<Policy> {
        tracing::debug!(
            key = %policy.key(),
            resource_version = %policy.metadata.resource_version,
            "Updating policy"
        );
        self.inner.update(policy).await
    }

    async fn update_status(&self, policy: Policy) -> Result<Policy> {
        tracing::debug!(
            key = %policy.key(),
            resource_version = %policy.metadata.resource_version,
            "Updating policy status"
        );
        self.inner.update_status(policy).await
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        tracing::debug!("Listing clusters");
        self.inner.list_clusters().await
    }
}
