//! Top-level controller resolution
//!
//! Walks the controlling-owner chain of a workload object up to its root,
//! e.g. ReplicaSet -> Deployment. Well-known kinds are answered from local
//! caches; anything else goes through discovery and the `scale` sub-resource.
//!
//! The resolvers only depend on the three collaborator traits
//! ([`ObjectCache`], [`ResourceMappingResolver`], [`ScaleSubresourceClient`]);
//! kube-backed implementations live in [`crate::kube`].

mod error;
mod fixed;
mod generic;
mod walker;
mod well_known;

pub use error::{BoxError, FetchError, FetchResult};
pub use fixed::{ConstantFetcher, IdentityFetcher, MockFetcher};
pub use generic::{
    GenericResolver, GroupVersion, NoResourceMapping, ResourceMapping, ResourceMappingResolver,
    ScaleSubresourceClient, parse_group_version,
};
pub use walker::OwnershipWalker;
pub use well_known::{ObjectCache, WellKnownObject, WellKnownResolver};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use crate::models::ControllerKeyWithApiVersion;

/// Finds the top-level controller of a controller key
#[async_trait]
pub trait ControllerFetcher: Send + Sync {
    /// Returns the root of the ownership chain starting at `key`
    ///
    /// `None` in gives `None` out. Errors are never retried here.
    async fn find_top_level(
        &self,
        key: Option<ControllerKeyWithApiVersion>,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>>;
}

/// The controlling owner among `owners`, keyed in `namespace`
///
/// If more than one reference is flagged as controller, the first one wins.
pub fn controlling_owner(
    owners: &[OwnerReference],
    namespace: &str,
) -> Option<ControllerKeyWithApiVersion> {
    owners
        .iter()
        .find(|owner| owner.controller == Some(true))
        .map(|owner| {
            ControllerKeyWithApiVersion::new(
                namespace,
                &owner.kind,
                &owner.name,
                &owner.api_version,
            )
        })
}
