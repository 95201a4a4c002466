//! `scale` sub-resource client

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};

use crate::fetcher::{BoxError, ResourceMapping, ScaleSubresourceClient};

/// Reads `.../scale` for any resource through the dynamic API
#[derive(Clone)]
pub struct KubeScaleClient {
    client: Client,
}

impl KubeScaleClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScaleSubresourceClient for KubeScaleClient {
    async fn get_scale(
        &self,
        mapping: &ResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<OwnerReference>, BoxError> {
        let resource = api_resource(mapping);
        let api: Api<DynamicObject> = if mapping.namespaced {
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        } else {
            Api::all_with(self.client.clone(), &resource)
        };

        let scale = api.get_scale(name).await?;
        Ok(scale.metadata.owner_references.unwrap_or_default())
    }
}

/// The dynamic `ApiResource` addressed by a mapping
pub fn api_resource(mapping: &ResourceMapping) -> ApiResource {
    let gvk = GroupVersionKind::gvk(&mapping.group, &mapping.version, &mapping.kind);
    ApiResource::from_gvk_with_plural(&gvk, &mapping.resource)
}
