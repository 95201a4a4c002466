//! Discovery + `scale` sub-resource resolution for arbitrary kinds
//!
//! Many custom controllers implement the `scale` sub-resource, and its
//! response carries the object's metadata, owner references included. That
//! lets us find the controlling owner of a kind we know nothing about without
//! decoding the kind itself.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde::{Deserialize, Serialize};

use super::controlling_owner;
use super::error::{BoxError, FetchError, FetchResult};
use crate::models::ControllerKeyWithApiVersion;

/// An API group and version parsed from an `apiVersion` string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

/// Split an `apiVersion` string into group and version
///
/// `"apps/v1"` is group `apps`, `"v1"` is the core group. An empty string
/// (or a lone `/`) parses to an empty group and version.
pub fn parse_group_version(api_version: &str) -> FetchResult<GroupVersion> {
    if api_version.is_empty() || api_version == "/" {
        return Ok(GroupVersion::default());
    }

    match api_version.split_once('/') {
        None => Ok(GroupVersion {
            group: String::new(),
            version: api_version.to_string(),
        }),
        Some((group, version)) if !version.contains('/') => Ok(GroupVersion {
            group: group.to_string(),
            version: version.to_string(),
        }),
        Some(_) => Err(FetchError::Parse {
            api_version: api_version.to_string(),
            reason: "unexpected GroupVersion string".to_string(),
        }),
    }
}

/// A concrete (group, version, resource) serving some kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMapping {
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. `deployments`
    pub resource: String,
    pub kind: String,
    pub namespaced: bool,
}

impl ResourceMapping {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for ResourceMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// Raised when discovery knows no resource for a group and kind
#[derive(Debug, thiserror::Error)]
#[error("no matches for kind {kind:?} in group {group:?}")]
pub struct NoResourceMapping {
    pub group: String,
    pub kind: String,
}

/// Maps an API group and kind to every resource that serves it
///
/// Implementations answer from their latest snapshot and never block on a refresh.
pub trait ResourceMappingResolver: Send + Sync {
    /// All mappings for `group`/`kind`, preferred first
    fn resource_mappings(&self, group: &str, kind: &str) -> Result<Vec<ResourceMapping>, BoxError>;
}

/// Reads the generic `scale` view of a namespaced resource
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScaleSubresourceClient: Send + Sync {
    /// Owner references reported by the scale sub-resource of `namespace/name`
    async fn get_scale(
        &self,
        mapping: &ResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<OwnerReference>, BoxError>;
}

/// Finds the controlling owner of any kind that exposes the `scale` sub-resource
#[derive(Clone)]
pub struct GenericResolver {
    mapper: Arc<dyn ResourceMappingResolver>,
    scales: Arc<dyn ScaleSubresourceClient>,
}

impl GenericResolver {
    pub fn new(
        mapper: Arc<dyn ResourceMappingResolver>,
        scales: Arc<dyn ScaleSubresourceClient>,
    ) -> Self {
        Self { mapper, scales }
    }

    /// Returns the controlling owner of `key`, or `None` if it has none
    pub async fn parent_of(
        &self,
        key: &ControllerKeyWithApiVersion,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        // TODO: cache positive lookups per (group, kind, namespace, name) between refreshes
        let group_version = parse_group_version(&key.api_version)?;

        self.owner_for_scale_resource(&group_version.group, key.kind(), key.namespace(), key.name())
            .await
            .map_err(|source| FetchError::ScaleUnavailable {
                api_version: key.api_version.clone(),
                kind: key.kind().to_string(),
                name: key.name().to_string(),
                source,
            })
    }

    async fn owner_for_scale_resource(
        &self,
        group: &str,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ControllerKeyWithApiVersion>, BoxError> {
        let mappings = self.mapper.resource_mappings(group, kind)?;

        let mut last_error: BoxError = Box::new(NoResourceMapping {
            group: group.to_string(),
            kind: kind.to_string(),
        });
        for mapping in &mappings {
            match self.scales.get_scale(mapping, namespace, name).await {
                Ok(owners) => return Ok(controlling_owner(&owners, namespace)),
                Err(e) => {
                    tracing::debug!(
                        mapping = %mapping,
                        namespace,
                        name,
                        error = %e,
                        "scale sub-resource unavailable, trying next mapping"
                    );
                    last_error = e;
                }
            }
        }

        // Nothing answered: the resource has no scale sub-resource, or we lack RBAC for it
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticMapper(HashMap<(String, String), Vec<ResourceMapping>>);

    impl ResourceMappingResolver for StaticMapper {
        fn resource_mappings(
            &self,
            group: &str,
            kind: &str,
        ) -> Result<Vec<ResourceMapping>, BoxError> {
            Ok(self
                .0
                .get(&(group.to_string(), kind.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn mapping(group: &str, version: &str, resource: &str, kind: &str) -> ResourceMapping {
        ResourceMapping {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
            namespaced: true,
        }
    }

    fn widget_mapper() -> Arc<StaticMapper> {
        let mut map = HashMap::new();
        map.insert(
            ("example.com".to_string(), "Widget".to_string()),
            vec![
                mapping("example.com", "v2", "widgets", "Widget"),
                mapping("example.com", "v1", "widgets", "Widget"),
            ],
        );
        Arc::new(StaticMapper(map))
    }

    fn controller_ref(kind: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "example.com/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            controller: Some(true),
            ..Default::default()
        }
    }

    fn widget(name: &str) -> ControllerKeyWithApiVersion {
        ControllerKeyWithApiVersion::new("team-a", "Widget", name, "example.com/v1")
    }

    #[test]
    fn test_parse_group_version() {
        assert_eq!(
            parse_group_version("apps/v1").unwrap(),
            GroupVersion {
                group: "apps".to_string(),
                version: "v1".to_string()
            }
        );
        assert_eq!(
            parse_group_version("v1").unwrap(),
            GroupVersion {
                group: String::new(),
                version: "v1".to_string()
            }
        );
        assert_eq!(parse_group_version("").unwrap(), GroupVersion::default());
        assert_eq!(parse_group_version("/").unwrap(), GroupVersion::default());
        assert!(matches!(
            parse_group_version("a/b/c"),
            Err(FetchError::Parse { .. })
        ));
    }

    #[test]
    fn test_mapping_api_version() {
        assert_eq!(mapping("", "v1", "pods", "Pod").api_version(), "v1");
        assert_eq!(
            mapping("apps", "v1", "deployments", "Deployment").api_version(),
            "apps/v1"
        );
        assert_eq!(
            mapping("apps", "v1", "deployments", "Deployment").to_string(),
            "apps/v1/deployments"
        );
    }

    #[tokio::test]
    async fn test_first_successful_mapping_wins() {
        let mut scales = MockScaleSubresourceClient::new();
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v2")
            .times(1)
            .returning(|_, _, _| Ok(vec![controller_ref("WidgetSet", "fleet")]));
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v1")
            .never();

        let resolver = GenericResolver::new(widget_mapper(), Arc::new(scales));
        let parent = resolver.parent_of(&widget("w-1")).await.unwrap();

        assert_eq!(
            parent,
            Some(ControllerKeyWithApiVersion::new(
                "team-a",
                "WidgetSet",
                "fleet",
                "example.com/v1"
            ))
        );
    }

    #[tokio::test]
    async fn test_falls_through_to_later_mapping() {
        let mut scales = MockScaleSubresourceClient::new();
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v2")
            .times(1)
            .returning(|_, _, _| Err("the server could not find the requested resource".into()));
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v1")
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let resolver = GenericResolver::new(widget_mapper(), Arc::new(scales));
        let parent = resolver.parent_of(&widget("w-1")).await.unwrap();

        assert_eq!(parent, None);
    }

    #[tokio::test]
    async fn test_all_mappings_failing_reports_last_error() {
        let mut scales = MockScaleSubresourceClient::new();
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v2")
            .returning(|_, _, _| Err("not found".into()));
        scales
            .expect_get_scale()
            .withf(|m, _, _| m.version == "v1")
            .returning(|_, _, _| Err("forbidden".into()));

        let resolver = GenericResolver::new(widget_mapper(), Arc::new(scales));
        let err = resolver.parent_of(&widget("w-1")).await.unwrap_err();

        match err {
            FetchError::ScaleUnavailable { source, kind, .. } => {
                assert_eq!(kind, "Widget");
                assert_eq!(source.to_string(), "forbidden");
            }
            other => panic!("expected ScaleUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_kind_is_scale_unavailable() {
        let mut scales = MockScaleSubresourceClient::new();
        scales.expect_get_scale().never();

        let resolver = GenericResolver::new(widget_mapper(), Arc::new(scales));
        let key = ControllerKeyWithApiVersion::new("team-a", "Gadget", "g", "example.com/v1");
        let err = resolver.parent_of(&key).await.unwrap_err();

        assert!(matches!(err, FetchError::ScaleUnavailable { .. }));
        assert!(err.to_string().contains("no matches for kind \"Gadget\""));
    }

    #[tokio::test]
    async fn test_malformed_api_version_is_parse_error() {
        let mut scales = MockScaleSubresourceClient::new();
        scales.expect_get_scale().never();

        let resolver = GenericResolver::new(widget_mapper(), Arc::new(scales));
        let key = ControllerKeyWithApiVersion::new("team-a", "Widget", "w", "example.com/v1/extra");
        let err = resolver.parent_of(&key).await.unwrap_err();

        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_mapper_failure_is_scale_unavailable() {
        struct Unready;
        impl ResourceMappingResolver for Unready {
            fn resource_mappings(
                &self,
                _: &str,
                _: &str,
            ) -> Result<Vec<ResourceMapping>, BoxError> {
                Err("discovery not yet completed".into())
            }
        }

        let resolver = GenericResolver::new(
            Arc::new(Unready),
            Arc::new(MockScaleSubresourceClient::new()),
        );
        let err = resolver.parent_of(&widget("w")).await.unwrap_err();

        assert!(matches!(err, FetchError::ScaleUnavailable { .. }));
        assert!(err.to_string().ends_with("discovery not yet completed"));
    }
}
