//! Target cluster registry entries.

use serde::{Deserialize, Serialize};

use crate::labels::Labels;

/// A registered destination for fan-out. Owned by the cluster registry, never
/// written by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl Cluster {
    /// Create a cluster entry with no labels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
        }
    }
}
