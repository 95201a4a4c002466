//! Well-known controller kinds
//!
//! The closed set of workload controller kinds that are mirrored into local
//! reflector caches and resolved without touching the API server. Anything
//! outside this set goes through discovery and the `scale` sub-resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Enumeration of the workload controller kinds with a dedicated cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WellKnownKind {
    // apps/v1
    DaemonSet,
    Deployment,
    ReplicaSet,
    StatefulSet,
    // core/v1
    ReplicationController,
    // batch/v1
    Job,
}

impl WellKnownKind {
    /// Get the kind name as it appears in `ownerReferences[].kind`
    pub fn as_str(&self) -> &'static str {
        match self {
            WellKnownKind::DaemonSet => "DaemonSet",
            WellKnownKind::Deployment => "Deployment",
            WellKnownKind::ReplicaSet => "ReplicaSet",
            WellKnownKind::StatefulSet => "StatefulSet",
            WellKnownKind::ReplicationController => "ReplicationController",
            WellKnownKind::Job => "Job",
        }
    }

    /// The `apiVersion` the cache for this kind is populated from
    pub fn api_version(&self) -> &'static str {
        match self {
            WellKnownKind::DaemonSet
            | WellKnownKind::Deployment
            | WellKnownKind::ReplicaSet
            | WellKnownKind::StatefulSet => "apps/v1",
            WellKnownKind::ReplicationController => "v1",
            WellKnownKind::Job => "batch/v1",
        }
    }

    /// Try to parse a kind name, returning None if it is not well-known
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all well-known kinds
    pub fn all() -> &'static [Self] {
        &[
            WellKnownKind::DaemonSet,
            WellKnownKind::Deployment,
            WellKnownKind::ReplicaSet,
            WellKnownKind::StatefulSet,
            WellKnownKind::ReplicationController,
            WellKnownKind::Job,
        ]
    }
}

impl fmt::Display for WellKnownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<WellKnownKind> for String {
    fn from(kind: WellKnownKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for WellKnownKind {
    type Err = String;

    /// Kinds are matched exactly; `deployment` is not a kind name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DaemonSet" => Ok(WellKnownKind::DaemonSet),
            "Deployment" => Ok(WellKnownKind::Deployment),
            "ReplicaSet" => Ok(WellKnownKind::ReplicaSet),
            "StatefulSet" => Ok(WellKnownKind::StatefulSet),
            "ReplicationController" => Ok(WellKnownKind::ReplicationController),
            "Job" => Ok(WellKnownKind::Job),
            _ => Err(format!("Unknown well-known controller kind: {}", s)),
        }
    }
}

/// The set of kinds served by the cache fast path
///
/// Built once from configuration at startup and handed to the walker.
/// Kinds left out of the set are resolved through the generic path instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownKinds {
    kinds: BTreeSet<WellKnownKind>,
}

impl WellKnownKinds {
    /// Every well-known kind enabled
    pub fn all() -> Self {
        WellKnownKind::all().iter().copied().collect()
    }

    /// Look up a kind name, returning the kind only if it is enabled
    pub fn lookup(&self, kind: &str) -> Option<WellKnownKind> {
        WellKnownKind::parse_optional(kind).filter(|k| self.kinds.contains(k))
    }

    pub fn contains(&self, kind: WellKnownKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = WellKnownKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for WellKnownKinds {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<WellKnownKind> for WellKnownKinds {
    fn from_iter<I: IntoIterator<Item = WellKnownKind>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(WellKnownKind::Deployment.as_str(), "Deployment");
        assert_eq!(
            WellKnownKind::ReplicationController.as_str(),
            "ReplicationController"
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            WellKnownKind::parse_optional("StatefulSet"),
            Some(WellKnownKind::StatefulSet)
        );
        assert_eq!(WellKnownKind::parse_optional("statefulset"), None);
        assert_eq!(WellKnownKind::parse_optional("CronJob"), None);
    }

    #[test]
    fn test_round_trip_all() {
        for kind in WellKnownKind::all() {
            assert_eq!(WellKnownKind::parse_optional(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn test_api_versions() {
        assert_eq!(WellKnownKind::ReplicaSet.api_version(), "apps/v1");
        assert_eq!(WellKnownKind::ReplicationController.api_version(), "v1");
        assert_eq!(WellKnownKind::Job.api_version(), "batch/v1");
    }

    #[test]
    fn test_serde_uses_kind_names() {
        let yaml = serde_yaml::to_string(&vec![WellKnownKind::DaemonSet]).unwrap();
        assert!(yaml.contains("DaemonSet"));
        let parsed: Vec<WellKnownKind> = serde_yaml::from_str("[Job, ReplicaSet]").unwrap();
        assert_eq!(parsed, vec![WellKnownKind::Job, WellKnownKind::ReplicaSet]);
    }

    #[test]
    fn test_kind_set_lookup_respects_enabled_kinds() {
        let kinds: WellKnownKinds = [WellKnownKind::Deployment, WellKnownKind::ReplicaSet]
            .into_iter()
            .collect();

        assert_eq!(kinds.lookup("Deployment"), Some(WellKnownKind::Deployment));
        // Well-known, but not enabled
        assert_eq!(kinds.lookup("Job"), None);
        assert_eq!(kinds.lookup("Rollout"), None);
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn test_default_kind_set_is_complete() {
        let kinds = WellKnownKinds::default();
        assert_eq!(kinds.len(), WellKnownKind::all().len());
        assert!(kinds.contains(WellKnownKind::ReplicationController));
    }
}
