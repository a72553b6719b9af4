//! The Policy resource: metadata, spec and compliance status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;
use crate::labels::Labels;

/// Back-link from a leaf to its root, consumed by the store's garbage
/// collector for cascade deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub uid: String,
    pub name: String,
}

/// Identity and bookkeeping fields of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub annotations: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Optimistic-concurrency token. Must be empty on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

/// How the policy engine acts on violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationAction {
    #[serde(alias = "Inform")]
    Inform,
    #[serde(alias = "Enforce")]
    Enforce,
}

/// Desired state of a policy. Copied verbatim onto every leaf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_action: Option<RemediationAction>,
    /// Opaque template documents interpreted by the policy engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_templates: Vec<serde_json::Value>,
}

/// Compliance of a policy on one or more clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceState {
    Compliant,
    NonCompliant,
    Pending,
}

impl ComplianceState {
    /// Combine per-cluster states into one.
    ///
    /// Any `NonCompliant` wins, then any `Pending`; `Compliant` only when every
    /// state is compliant. No states yields `None`.
    pub fn aggregate(states: impl IntoIterator<Item = Self>) -> Option<Self> {
        states.into_iter().fold(None, |acc, state| match (acc, state) {
            (Some(Self::NonCompliant), _) | (_, Self::NonCompliant) => Some(Self::NonCompliant),
            (Some(Self::Pending), _) | (_, Self::Pending) => Some(Self::Pending),
            (_, Self::Compliant) => Some(Self::Compliant),
        })
    }
}

/// Where a policy is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placement_binding: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placement_rule: String,
}

/// Compliance reported for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompliancePerClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<ComplianceState>,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_namespace: String,
}

impl CompliancePerClusterStatus {
    /// Status record for `cluster` in the given state.
    pub fn new(cluster: impl Into<String>, compliant: ComplianceState) -> Self {
        Self {
            compliant: Some(compliant),
            cluster_name: cluster.into(),
            cluster_namespace: String::new(),
        }
    }
}

/// One entry of a template's compliance history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event_name: String,
}

impl ComplianceHistory {
    /// History entry stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            last_timestamp: Some(Utc::now()),
            message: message.into(),
            event_name: String::new(),
        }
    }
}

/// Compliance details for a single policy template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsPerTemplate {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<ComplianceState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ComplianceHistory>,
}

/// Observed state of a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement: Vec<Placement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<CompliancePerClusterStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<ComplianceState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailsPerTemplate>,
}

impl PolicyStatus {
    /// Every history message recorded across all template details.
    pub fn history_messages(&self) -> impl Iterator<Item = &str> {
        self.details
            .iter()
            .flat_map(|d| d.history.iter())
            .map(|h| h.message.as_str())
    }
}

/// The managed resource. A root when it has no cluster-assignment label,
/// otherwise a per-cluster leaf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PolicySpec,
    #[serde(default)]
    pub status: PolicyStatus,
}

impl Policy {
    /// Create an empty policy.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..ObjectMeta::default()
            },
            ..Self::default()
        }
    }

    /// Set a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    /// Replace the spec.
    #[must_use]
    pub fn with_spec(mut self, spec: PolicySpec) -> Self {
        self.spec = spec;
        self
    }

    /// Replace the status.
    #[must_use]
    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Namespaced key of this object.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }

    /// Name of the object.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Value of a label, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    /// Owner reference pointing at this object.
    pub fn owner_reference(
        &self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
    ) -> OwnerReference {
        OwnerReference {
            api_version: api_version.into(),
            kind: kind.into(),
            uid: self.metadata.uid.clone(),
            name: self.metadata.name.clone(),
        }
    }

    /// Whether any owner reference carries `uid`.
    pub fn is_owned_by_uid(&self, uid: &str) -> bool {
        self.metadata
            .owner_references
            .iter()
            .any(|owner| owner.uid == uid)
    }
}
