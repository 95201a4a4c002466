//! Cache-backed resolution for well-known controller kinds

use std::sync::Arc;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ReplicationController;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

use super::controlling_owner;
use super::error::{BoxError, FetchError, FetchResult};
use crate::models::{ControllerKeyWithApiVersion, WellKnownKind};

/// A cached object of one of the well-known kinds
#[derive(Debug, Clone)]
pub enum WellKnownObject {
    DaemonSet(Arc<DaemonSet>),
    Deployment(Arc<Deployment>),
    ReplicaSet(Arc<ReplicaSet>),
    StatefulSet(Arc<StatefulSet>),
    ReplicationController(Arc<ReplicationController>),
    Job(Arc<Job>),
}

impl WellKnownObject {
    pub fn kind(&self) -> WellKnownKind {
        match self {
            WellKnownObject::DaemonSet(_) => WellKnownKind::DaemonSet,
            WellKnownObject::Deployment(_) => WellKnownKind::Deployment,
            WellKnownObject::ReplicaSet(_) => WellKnownKind::ReplicaSet,
            WellKnownObject::StatefulSet(_) => WellKnownKind::StatefulSet,
            WellKnownObject::ReplicationController(_) => WellKnownKind::ReplicationController,
            WellKnownObject::Job(_) => WellKnownKind::Job,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            WellKnownObject::DaemonSet(obj) => &obj.metadata,
            WellKnownObject::Deployment(obj) => &obj.metadata,
            WellKnownObject::ReplicaSet(obj) => &obj.metadata,
            WellKnownObject::StatefulSet(obj) => &obj.metadata,
            WellKnownObject::ReplicationController(obj) => &obj.metadata,
            WellKnownObject::Job(obj) => &obj.metadata,
        }
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata()
            .owner_references
            .as_deref()
            .unwrap_or_default()
    }
}

macro_rules! impl_from_object {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<Arc<$variant>> for WellKnownObject {
                fn from(obj: Arc<$variant>) -> Self {
                    WellKnownObject::$variant(obj)
                }
            }

            impl From<$variant> for WellKnownObject {
                fn from(obj: $variant) -> Self {
                    WellKnownObject::$variant(Arc::new(obj))
                }
            }
        )*
    };
}

impl_from_object!(
    DaemonSet,
    Deployment,
    ReplicaSet,
    StatefulSet,
    ReplicationController,
    Job,
);

/// Namespace/name keyed lookup into locally mirrored objects, one index per kind
///
/// Implementations must only be queried for a kind once its initial sync has
/// completed; before that, present objects may look absent.
pub trait ObjectCache: Send + Sync {
    fn get(
        &self,
        kind: WellKnownKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<WellKnownObject>, BoxError>;
}

/// Finds the controlling owner of a well-known controller via [`ObjectCache`]
#[derive(Clone)]
pub struct WellKnownResolver {
    cache: Arc<dyn ObjectCache>,
}

impl WellKnownResolver {
    pub fn new(cache: Arc<dyn ObjectCache>) -> Self {
        Self { cache }
    }

    /// Returns the controlling owner of `key`, or `None` if it has none
    pub fn parent_of(
        &self,
        kind: WellKnownKind,
        key: &ControllerKeyWithApiVersion,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        let namespace = key.namespace();
        let name = key.name();

        let obj = self
            .cache
            .get(kind, namespace, name)
            .map_err(|source| FetchError::CacheLookup {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| FetchError::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        if obj.kind() != kind {
            return Err(FetchError::UnsupportedKind {
                expected: kind.to_string(),
                found: obj.kind().to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }

        Ok(controlling_owner(obj.owner_references(), namespace))
    }
}
