//! Protocol label keys and equality label selectors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Label mapping carried by every object.
pub type Labels = BTreeMap<String, String>;

/// Label naming the cluster a policy is assigned to. Absent on roots.
pub const CLUSTER_LABEL: &str = "kcp.dev/cluster";

/// Label naming the root policy a leaf was split from.
pub const OWNED_BY_LABEL: &str = "kcp.dev/owned-by";

/// Equality predicate over a single label: `key=value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    /// Select objects whose `key` label equals `value`.
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `key=value` selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if there is no `=` or the key is empty.
    pub fn parse(input: &str) -> Result<Self> {
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| Error::invalid_selector(input, "expected 'key=value'"))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_selector(input, "label key is empty"));
        }

        Ok(Self::equals(key, value.trim()))
    }

    /// Whether the labels satisfy this selector.
    pub fn matches(&self, labels: &Labels) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for LabelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
