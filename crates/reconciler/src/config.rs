//! Configuration for the reconciler.

use std::path::Path;

use serde::{Deserialize, Serialize};
use splitter_core::{CLUSTER_LABEL, LabelSelector, OWNED_BY_LABEL};

use crate::error::{Error, Result};

/// Environment variable overriding the cluster-assignment label key.
pub const ENV_CLUSTER_LABEL: &str = "SPLITTER_CLUSTER_LABEL";
/// Environment variable overriding the owned-by label key.
pub const ENV_OWNED_BY_LABEL: &str = "SPLITTER_OWNED_BY_LABEL";
/// Environment variable overriding the owner reference apiVersion.
pub const ENV_OWNER_API_VERSION: &str = "SPLITTER_OWNER_API_VERSION";
/// Environment variable overriding the owner reference kind.
pub const ENV_OWNER_KIND: &str = "SPLITTER_OWNER_KIND";
/// Environment variable overriding the leaf name separator.
pub const ENV_LEAF_SEPARATOR: &str = "SPLITTER_LEAF_SEPARATOR";
/// Environment variable overriding the zero-cluster status message.
pub const ENV_NO_CLUSTERS_MESSAGE: &str = "SPLITTER_NO_CLUSTERS_MESSAGE";

/// Configuration for the reconciler.
///
/// Every field has a default, so partial files are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Label assigning a policy to a cluster. Absent on roots.
    pub cluster_label: String,
    /// Label naming the root a leaf belongs to.
    pub owned_by_label: String,
    /// apiVersion written into leaf owner references.
    pub owner_api_version: String,
    /// Kind written into leaf owner references.
    pub owner_kind: String,
    /// Joins root and cluster names into a leaf name.
    pub leaf_separator: String,
    /// Recorded on a root when no cluster is registered.
    pub no_clusters_message: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cluster_label: CLUSTER_LABEL.to_string(),
            owned_by_label: OWNED_BY_LABEL.to_string(),
            owner_api_version: "policy.open-cluster-management.io/v1".to_string(),
            owner_kind: "Policy".to_string(),
            leaf_separator: "--".to_string(),
            no_clusters_message: "no clusters registered to receive this policy".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Set the cluster-assignment label key.
    #[must_use]
    pub fn with_cluster_label(mut self, label: impl Into<String>) -> Self {
        self.cluster_label = label.into();
        self
    }

    /// Set the owned-by label key.
    #[must_use]
    pub fn with_owned_by_label(mut self, label: impl Into<String>) -> Self {
        self.owned_by_label = label.into();
        self
    }

    /// Set the leaf name separator.
    #[must_use]
    pub fn with_leaf_separator(mut self, separator: impl Into<String>) -> Self {
        self.leaf_separator = separator.into();
        self
    }

    /// Selector matching every leaf of `root`.
    pub fn leafs_of(&self, root: &str) -> LabelSelector {
        LabelSelector::equals(self.owned_by_label.clone(), root)
    }

    /// Check the configuration for values that would break the protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for empty label keys, identical
    /// cluster and owned-by keys, or an empty leaf separator.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_label.trim().is_empty() {
            return Err(Error::invalid_config("cluster_label must not be empty"));
        }
        if self.owned_by_label.trim().is_empty() {
            return Err(Error::invalid_config("owned_by_label must not be empty"));
        }
        if self.cluster_label == self.owned_by_label {
            return Err(Error::invalid_config(
                "cluster_label and owned_by_label must differ",
            ));
        }
        if self.leaf_separator.is_empty() {
            return Err(Error::invalid_config("leaf_separator must not be empty"));
        }
        Ok(())
    }

    /// Load configuration from a file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRead`] or [`Error::ConfigParse`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::config_read(path, e.to_string()))?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))
        }
    }

    /// Default configuration overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`, keyed by the `SPLITTER_*` variable names.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 6] = [
            (ENV_CLUSTER_LABEL, &mut self.cluster_label),
            (ENV_OWNED_BY_LABEL, &mut self.owned_by_label),
            (ENV_OWNER_API_VERSION, &mut self.owner_api_version),
            (ENV_OWNER_KIND, &mut self.owner_kind),
            (ENV_LEAF_SEPARATOR, &mut self.leaf_separator),
            (ENV_NO_CLUSTERS_MESSAGE, &mut self.no_clusters_message),
        ];

        for (name, field) in fields {
            if let Some(value) = lookup(name) {
                *field = value;
            }
        }
        self
    }
}
