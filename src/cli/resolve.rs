//! `resolve` and `pod` command handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use serde::Serialize;

use ownerchain::config::Config;
use ownerchain::fetcher::{ControllerFetcher, OwnershipWalker, controlling_owner};
use ownerchain::kube::{DiscoveryMapper, KubeScaleClient, MappingRefresher, WorkloadCache};
use ownerchain::models::{ControllerKeyWithApiVersion, WellKnownKind};

/// How results are printed
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution {
    start: ControllerKeyWithApiVersion,
    top_level: Option<ControllerKeyWithApiVersion>,
}

/// Everything a walk needs, plus the background tasks feeding it
pub struct Session {
    client: Client,
    walker: OwnershipWalker,
    refresher: MappingRefresher,
}

impl Session {
    /// Start the caches and discovery, and wait until both can answer
    pub async fn start(client: Client, config: &Config) -> Result<Self> {
        let kinds = config.well_known_kinds();

        tracing::debug!("Starting workload caches");
        let cache = Arc::new(WorkloadCache::start(
            client.clone(),
            config.watch_namespace(),
            kinds.clone(),
        ));
        let unsynced = cache.wait_for_sync(config.cache_sync_timeout()).await;
        if !unsynced.is_empty() {
            tracing::warn!(
                ?unsynced,
                "continuing with unsynced caches, lookups of these kinds may miss objects"
            );
        }

        tracing::debug!("Running initial API discovery");
        let mapper = DiscoveryMapper::new(client.clone());
        match mapper.refresh().await {
            Ok(mappings) => tracing::debug!(mappings, "API discovery completed"),
            Err(e) => tracing::warn!(
                error = %e,
                "initial API discovery failed, non-cached kinds resolve once a refresh succeeds"
            ),
        }
        let refresher = mapper.spawn_refresher(config.discovery_refresh_period());

        let walker = OwnershipWalker::new(
            kinds,
            cache,
            Arc::new(mapper),
            Arc::new(KubeScaleClient::new(client.clone())),
        );

        Ok(Self {
            client,
            walker,
            refresher,
        })
    }

    /// Stop the background tasks
    pub async fn shutdown(self) {
        self.refresher.shutdown().await;
    }
}

/// Build the starting key of a `resolve` call
///
/// `api_version` may be omitted for the well-known kinds only.
pub fn start_key(
    namespace: String,
    kind: String,
    name: String,
    api_version: Option<String>,
) -> Result<ControllerKeyWithApiVersion> {
    let api_version = match api_version {
        Some(v) => v,
        None => WellKnownKind::parse_optional(&kind)
            .map(|k| k.api_version().to_string())
            .with_context(|| format!("--api-version is required for kind {}", kind))?,
    };
    Ok(ControllerKeyWithApiVersion::new(namespace, kind, name, api_version))
}

/// Resolve the top-level controller of a controller key
pub async fn resolve(
    session: &Session,
    start: ControllerKeyWithApiVersion,
    output: OutputFormat,
) -> Result<()> {
    let top_level = session
        .walker
        .find_top_level(Some(start.clone()))
        .await
        .with_context(|| format!("Failed to resolve top-level controller of {}", start))?;

    print_resolution(&Resolution { start, top_level }, output)
}

/// Resolve the top-level controller of a Pod
///
/// A Pod without a controlling owner is its own root.
pub async fn resolve_pod(
    session: &Session,
    namespace: &str,
    name: &str,
    output: OutputFormat,
) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(session.client.clone(), namespace);
    let pod = pods
        .get(name)
        .await
        .with_context(|| format!("Failed to get Pod {}/{}", namespace, name))?;

    let pod_key = ControllerKeyWithApiVersion::new(namespace, "Pod", name, "v1");
    let owners = pod.metadata.owner_references.unwrap_or_default();

    let Some(owner) = controlling_owner(&owners, namespace) else {
        tracing::debug!(pod = %pod_key, "pod has no controlling owner");
        return print_resolution(
            &Resolution {
                start: pod_key.clone(),
                top_level: Some(pod_key),
            },
            output,
        );
    };

    let top_level = session
        .walker
        .find_top_level(Some(owner))
        .await
        .with_context(|| format!("Failed to resolve top-level controller of {}", pod_key))?;

    print_resolution(
        &Resolution {
            start: pod_key,
            top_level,
        },
        output,
    )
}

fn print_resolution(resolution: &Resolution, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => match &resolution.top_level {
            Some(top) => println!("{}", top),
            None => println!("<none>"),
        },
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(resolution)
                .context("Failed to serialize resolution")?;
            println!("{}", json);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_key_defaults_well_known_api_version() {
        let key = start_key(
            "team-a".to_string(),
            "StatefulSet".to_string(),
            "db".to_string(),
            None,
        )
        .unwrap();
        assert_eq!(key.api_version, "apps/v1");
        assert_eq!(key.key.kind, "StatefulSet");
    }

    #[test]
    fn test_start_key_requires_api_version_for_other_kinds() {
        let err = start_key(
            "team-a".to_string(),
            "Rollout".to_string(),
            "canary".to_string(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "--api-version is required for kind Rollout");

        let key = start_key(
            "team-a".to_string(),
            "Rollout".to_string(),
            "canary".to_string(),
            Some("argoproj.io/v1alpha1".to_string()),
        )
        .unwrap();
        assert_eq!(key.api_version, "argoproj.io/v1alpha1");
    }
}
