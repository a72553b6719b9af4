//! Namespaced object identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifies a policy by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a sibling object in the same namespace.
    #[must_use]
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ObjectKey {
    type Err = Error;

    /// Parses `namespace/name`, or a bare `name` in the empty namespace.
    fn from_str(s: &str) -> Result<Self> {
        let (namespace, name) = s.split_once('/').unwrap_or(("", s));

        if name.is_empty() {
            return Err(Error::invalid_key(s, "name is empty"));
        }
        if name.contains('/') {
            return Err(Error::invalid_key(s, "expected 'namespace/name'"));
        }

        Ok(Self::new(namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ObjectKey::new("default", "root").to_string(), "default/root");
    }

    #[test]
    fn test_parse_namespaced() {
        assert_eq!(
            "policies/root".parse::<ObjectKey>(),
            Ok(ObjectKey::new("policies", "root"))
        );
    }

    #[test]
    fn test_parse_bare_name() {
        assert_eq!("root".parse::<ObjectKey>(), Ok(ObjectKey::new("", "root")));
    }

    #[test]
    fn test_parse_rejects_empty_and_nested() {
        assert!("default/".parse::<ObjectKey>().is_err());
        assert!("a/b/c".parse::<ObjectKey>().is_err());
    }

    #[test]
    fn should_keep_namespace_for_sibling() {
        let key = ObjectKey::new("default", "root--c1");
        assert_eq!(key.sibling("root"), ObjectKey::new("default", "root"));
    }
}
