//! Simulation fixtures.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use splitter_core::{Cluster, ObjectKey, Policy, PolicyStatus};

/// Starting world for a simulation, plus the events to replay against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Target cluster registry.
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// Policies seeded verbatim into the store.
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Status writes applied after the first convergence, standing in for
    /// the per-cluster compliance reporter.
    #[serde(default)]
    pub reports: Vec<StatusReport>,
    /// Objects deleted after the reports have converged.
    #[serde(default)]
    pub deletions: Vec<ObjectKey>,
}

/// A status write against one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    pub status: PolicyStatus,
}

impl StatusReport {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Fixture {
    /// Load a fixture. `.json` files are parsed as JSON, everything else as
    /// YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        load_document(path)
    }

    /// The seeded policy at `key`, if any.
    pub fn policy(&self, key: &ObjectKey) -> Option<&Policy> {
        self.policies.iter().find(|policy| policy.key() == *key)
    }
}

/// Read a YAML or JSON document, choosing by extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {} as YAML", path.display()))
    }
}
