//! Controller identity types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a namespaced controller object by kind and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerKey {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

impl ControllerKey {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ControllerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A [`ControllerKey`] plus the API version the kind is served under
///
/// The API version only matters for kinds resolved through discovery.
/// Well-known kinds are matched by kind alone, but the version still takes
/// part in equality, so the same object reached through two different
/// `apiVersion` strings counts as two distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerKeyWithApiVersion {
    #[serde(flatten)]
    pub key: ControllerKey,
    pub api_version: String,
}

impl ControllerKeyWithApiVersion {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            key: ControllerKey::new(namespace, kind, name),
            api_version: api_version.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn kind(&self) -> &str {
        &self.key.kind
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }
}

impl fmt::Display for ControllerKeyWithApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.api_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let key = ControllerKeyWithApiVersion::new("default", "Deployment", "web", "apps/v1");
        assert_eq!(key.to_string(), "Deployment default/web (apps/v1)");
    }

    #[test]
    fn test_api_version_is_part_of_identity() {
        let v1 = ControllerKeyWithApiVersion::new("default", "Deployment", "web", "apps/v1");
        let beta = ControllerKeyWithApiVersion::new("default", "Deployment", "web", "apps/v1beta2");
        assert_eq!(v1.key, beta.key);
        assert_ne!(v1, beta);
    }

    #[test]
    fn test_serialization_is_flat() {
        let key =
            ControllerKeyWithApiVersion::new("ns", "Rollout", "canary", "argoproj.io/v1alpha1");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["namespace"], "ns");
        assert_eq!(json["kind"], "Rollout");
        assert_eq!(json["name"], "canary");
        assert_eq!(json["apiVersion"], "argoproj.io/v1alpha1");

        let back: ControllerKeyWithApiVersion = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
