//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and provides the
//! kube-backed implementations of the resolver collaborators:
//! - [`WorkloadCache`]: reflector stores for the well-known kinds
//! - [`DiscoveryMapper`]: group+kind to resource mappings via API discovery
//! - [`KubeScaleClient`]: the `scale` sub-resource of any mapping

pub mod cache;
pub mod discovery;
pub mod scale;

pub use cache::{CacheDisabled, WorkloadCache, WorkloadStores};
pub use discovery::{DiscoveryMapper, DiscoveryPending, MappingRefresher, MappingSnapshot};
pub use scale::KubeScaleClient;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// Uses the default kubeconfig loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client() -> Result<Client> {
    let config = Config::infer()
        .await
        .context("Failed to infer Kubernetes config")?;
    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Initialize a client for a named kubeconfig context
pub async fn create_client_for_context(context: &str) -> Result<Client> {
    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    let config = Config::from_kubeconfig(&options)
        .await
        .with_context(|| format!("Failed to load kubeconfig context '{}'", context))?;
    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Get the current kubeconfig context name, if there is a kubeconfig
pub fn current_context() -> Option<String> {
    Kubeconfig::read()
        .ok()
        .and_then(|kubeconfig| kubeconfig.current_context)
        .filter(|ctx| !ctx.is_empty())
}
