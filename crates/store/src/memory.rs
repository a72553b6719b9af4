//! In-memory object store.
//!
//! Mirrors the semantics the reconciler relies on from a real API server:
//! store-assigned uids and resource versions, optimistic concurrency on
//! writes, status written through its own call, and owner-reference cascade
//! deletion.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use splitter_core::{Cluster, LabelSelector, ObjectKey, Policy};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Operation, Result};
use crate::store::ObjectStore;

/// In-memory object store for tests and offline simulation.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectKey, Policy>>,
    clusters: RwLock<Vec<Cluster>>,
    faults: Mutex<HashMap<Operation, VecDeque<Option<Error>>>>,
    revision: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a target cluster. Re-registering a name replaces the entry.
    pub async fn register_cluster(&self, cluster: Cluster) {
        let mut clusters = self.clusters.write().await;
        clusters.retain(|c| c.name != cluster.name);
        clusters.push(cluster);
    }

    /// Remove a cluster from the registry. Returns whether it was present.
    pub async fn remove_cluster(&self, name: &str) -> bool {
        let mut clusters = self.clusters.write().await;
        let before = clusters.len();
        clusters.retain(|c| c.name != name);
        clusters.len() != before
    }

    /// Insert a policy verbatim, assigning a uid if missing and a fresh
    /// resource version. Replaces any existing object and is not counted as
    /// a write.
    pub async fn seed(&self, mut policy: Policy) -> Policy {
        if policy.metadata.uid.is_empty() {
            policy.metadata.uid = Uuid::new_v4().to_string();
        }
        policy.metadata.resource_version = self.next_version();

        self.objects
            .write()
            .await
            .insert(policy.key(), policy.clone());
        policy
    }

    /// Delete a policy and, transitively, everything it owns.
    ///
    /// Returns the keys removed, the requested object first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the object does not exist.
    pub async fn delete(&self, key: &ObjectKey) -> Result<Vec<ObjectKey>> {
        self.take_fault(Operation::Delete).await?;

        let mut objects = self.objects.write().await;
        let root = objects
            .remove(key)
            .ok_or_else(|| Error::not_found(key.clone()))?;

        let mut removed = vec![key.clone()];
        let mut pending: Vec<String> = vec![root.metadata.uid];
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(uid) = pending.pop() {
            if !seen.insert(uid.clone()) {
                continue;
            }
            let owned: Vec<ObjectKey> = objects
                .values()
                .filter(|p| p.is_owned_by_uid(&uid))
                .map(Policy::key)
                .collect();
            for child in owned {
                if let Some(policy) = objects.remove(&child) {
                    tracing::debug!(key = %child, owner_uid = %uid, "Collected dependent");
                    pending.push(policy.metadata.uid);
                    removed.push(child);
                }
            }
        }

        self.record_write();
        Ok(removed)
    }

    /// Fail the next call of `operation` with `error`. Faults queue in order.
    pub async fn inject_failure(&self, operation: Operation, error: Error) {
        self.inject_failure_after(operation, 0, error).await;
    }

    /// Let `successes` calls of `operation` through, then fail one with `error`.
    pub async fn inject_failure_after(&self, operation: Operation, successes: usize, error: Error) {
        let mut faults = self.faults.lock().await;
        let queue = faults.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(None, successes));
        queue.push_back(Some(error));
    }

    /// Number of successful writes (create, update, update_status, delete).
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Keys of every stored object, in key order.
    pub async fn keys(&self) -> Vec<ObjectKey> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Snapshot of every stored object, in key order.
    pub async fn objects(&self) -> Vec<Policy> {
        self.objects.read().await.values().cloned().collect()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn take_fault(&self, operation: Operation) -> Result<()> {
        let mut faults = self.faults.lock().await;
        match faults.get_mut(&operation).and_then(VecDeque::pop_front).flatten() {
            Some(err) => {
                tracing::debug!(%operation, error = %err, "Injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn next_version(&self) -> String {
        self.revision
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
            .to_string()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::AcqRel);
    }

    fn check_version(current: &Policy, incoming: &Policy) -> Result<()> {
        if current.metadata.resource_version == incoming.metadata.resource_version {
            Ok(())
        } else {
            Err(Error::conflict(
                incoming.key(),
                incoming.metadata.resource_version.clone(),
                current.metadata.resource_version.clone(),
            ))
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<Policy> {
        self.take_fault(Operation::Get).await?;

        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key.clone()))
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Policy>> {
        self.take_fault(Operation::List).await?;

        Ok(self
            .objects
            .read()
            .await
            .values()
            .filter(|p| p.metadata.namespace == namespace && selector.matches(&p.metadata.labels))
            .cloned()
            .collect())
    }

    async fn create(&self, mut policy: Policy) -> Result<Policy> {
        self.take_fault(Operation::Create).await?;

        let key = policy.key();
        if key.name.is_empty() {
            return Err(Error::invalid(key, "name is required"));
        }
        if !policy.metadata.resource_version.is_empty() {
            return Err(Error::invalid(
                key,
                "resource version must not be set on create",
            ));
        }

        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(Error::already_exists(key));
        }

        policy.metadata.uid = Uuid::new_v4().to_string();
        policy.metadata.resource_version = self.next_version();
        policy.status = splitter_core::PolicyStatus::default();

        objects.insert(key, policy.clone());
        self.record_write();
        Ok(policy)
    }

    async fn update(&self, policy: Policy) -> Result<Policy> {
        self.take_fault(Operation::Update).await?;

        let key = policy.key();
        let mut objects = self.objects.write().await;
        let current = objects
            .get(&key)
            .ok_or_else(|| Error::not_found(key.clone()))?;
        Self::check_version(current, &policy)?;

        let updated = Policy {
            metadata: splitter_core::ObjectMeta {
                uid: current.metadata.uid.clone(),
                resource_version: self.next_version(),
                ..policy.metadata
            },
            spec: policy.spec,
            status: current.status.clone(),
        };

        objects.insert(key, updated.clone());
        self.record_write();
        Ok(updated)
    }

    async fn update_status(&self, policy: Policy) -> Result<Policy> {
        self.take_fault(Operation::UpdateStatus).await?;

        let key = policy.key();
        let mut objects = self.objects.write().await;
        let current = objects
            .get(&key)
            .ok_or_else(|| Error::not_found(key.clone()))?;
        Self::check_version(current, &policy)?;

        let mut updated = current.clone();
        updated.status = policy.status;
        updated.metadata.resource_version = self.next_version();

        objects.insert(key, updated.clone());
        self.record_write();
        Ok(updated)
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        self.take_fault(Operation::ListClusters).await?;

        Ok(self.clusters.read().await.clone())
    }
}
