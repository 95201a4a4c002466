//! Discovery-backed resource mappings
//!
//! [`DiscoveryMapper`] answers group+kind lookups from the last committed
//! discovery snapshot. A [`MappingRefresher`] re-runs discovery in the
//! background so newly installed CRDs are picked up.
//!
//! Groups are queried one at a time. A group that fails (an aggregated API
//! whose backend is down, typically) keeps the mappings it had in the
//! previous snapshot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use kube::Client;
use kube::core::GroupVersion;
use kube::discovery::{self, ApiGroup, Scope};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetcher::{BoxError, ResourceMapping, ResourceMappingResolver};

/// Raised when a lookup happens before the first discovery run finished
#[derive(Debug, thiserror::Error)]
#[error("discovery not yet completed")]
pub struct DiscoveryPending;

/// Immutable group+kind index over a set of resource mappings
#[derive(Debug, Clone, Default)]
pub struct MappingSnapshot {
    by_group_kind: HashMap<(String, String), Vec<ResourceMapping>>,
}

impl MappingSnapshot {
    /// Index mappings by group and kind, keeping their relative order
    pub fn from_mappings(mappings: impl IntoIterator<Item = ResourceMapping>) -> Self {
        let mut by_group_kind: HashMap<(String, String), Vec<ResourceMapping>> = HashMap::new();
        for mapping in mappings {
            let entry = by_group_kind
                .entry((mapping.group.clone(), mapping.kind.clone()))
                .or_default();
            if !entry.contains(&mapping) {
                entry.push(mapping);
            }
        }
        Self { by_group_kind }
    }

    /// Mappings of one version of a discovered group
    fn from_group(group: &ApiGroup, version: &str) -> Vec<ResourceMapping> {
        group
            .versioned_resources(version)
            .into_iter()
            .map(|(resource, caps)| ResourceMapping {
                group: resource.group,
                version: resource.version,
                resource: resource.plural,
                kind: resource.kind,
                namespaced: matches!(caps.scope, Scope::Namespaced),
            })
            .collect()
    }

    /// All mappings of `group`, in snapshot order per kind
    pub fn group_mappings(&self, group: &str) -> Vec<ResourceMapping> {
        self.by_group_kind
            .iter()
            .filter(|((g, _), _)| g == group)
            .flat_map(|(_, mappings)| mappings.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_group_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_group_kind.is_empty()
    }
}

impl ResourceMappingResolver for MappingSnapshot {
    fn resource_mappings(&self, group: &str, kind: &str) -> Result<Vec<ResourceMapping>, BoxError> {
        Ok(self
            .by_group_kind
            .get(&(group.to_string(), kind.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Orders `versions` with `preferred` first, the rest in their original order
fn preferred_first<'a>(
    preferred: &'a str,
    versions: impl Iterator<Item = &'a str>,
) -> Vec<&'a str> {
    std::iter::once(preferred)
        .chain(versions.filter(|v| *v != preferred))
        .collect()
}

/// Resolves group+kind to resource mappings using live API discovery
#[derive(Clone)]
pub struct DiscoveryMapper {
    client: Client,
    snapshot: Arc<RwLock<Option<Arc<MappingSnapshot>>>>,
}

impl DiscoveryMapper {
    /// Create a mapper with no snapshot; call [`DiscoveryMapper::refresh`] before use
    pub fn new(client: Client) -> Self {
        Self {
            client,
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Run discovery once and commit the result
    ///
    /// Fails, leaving the previous snapshot in place, when the group list
    /// cannot be read or every group fails. A single failing group only
    /// keeps its previous mappings.
    pub async fn refresh(&self) -> Result<usize> {
        let listed = self
            .client
            .list_api_groups()
            .await
            .context("Failed to list API groups")?;

        let mut groups = vec![(ApiGroup::CORE_GROUP.to_string(), None, Vec::new())];
        for group in listed.groups {
            let preferred = group.preferred_version.map(|p| p.version);
            let versions = group.versions.into_iter().map(|v| v.version).collect();
            groups.push((group.name, preferred, versions));
        }

        let previous = self.snapshot();
        let mut mappings = Vec::new();
        let mut failed = 0;
        for (name, preferred, versions) in &groups {
            match self.discover_group(name, preferred.as_deref(), versions).await {
                Ok(found) => mappings.extend(found),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        group = %name,
                        error = %e,
                        "skipping API group that failed discovery"
                    );
                    if let Some(previous) = &previous {
                        mappings.extend(previous.group_mappings(name));
                    }
                }
            }
        }
        if failed == groups.len() {
            anyhow::bail!("discovery failed for all {} API groups", failed);
        }

        let snapshot = Arc::new(MappingSnapshot::from_mappings(mappings));
        let count = snapshot.len();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);

        tracing::debug!(
            mappings = count,
            failed_groups = failed,
            "refreshed API discovery snapshot"
        );
        Ok(count)
    }

    /// Mappings of one group, preferred version first
    ///
    /// The core group lists its own versions. Any failing version fails the
    /// whole group.
    async fn discover_group(
        &self,
        name: &str,
        preferred: Option<&str>,
        versions: &[String],
    ) -> Result<Vec<ResourceMapping>, kube::Error> {
        if name == ApiGroup::CORE_GROUP {
            let core = discovery::group(&self.client, ApiGroup::CORE_GROUP).await?;
            let preferred = core.preferred_version_or_latest();
            return Ok(preferred_first(preferred, core.versions())
                .into_iter()
                .flat_map(|version| MappingSnapshot::from_group(&core, version))
                .collect());
        }

        let preferred = preferred.or_else(|| versions.first().map(String::as_str));
        let Some(preferred) = preferred else {
            return Ok(Vec::new());
        };

        let mut mappings = Vec::new();
        for version in preferred_first(preferred, versions.iter().map(String::as_str)) {
            let gv = GroupVersion::gv(name, version);
            let pinned = discovery::pinned_group(&self.client, &gv).await?;
            mappings.extend(MappingSnapshot::from_group(&pinned, version));
        }
        Ok(mappings)
    }

    /// The last committed snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<MappingSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-run discovery every `period` until the returned handle is shut down
    ///
    /// The first refresh happens one `period` from now.
    pub fn spawn_refresher(&self, period: Duration) -> MappingRefresher {
        let mapper = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("discovery refresher stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = mapper.refresh().await {
                            tracing::warn!(
                                error = %e,
                                "discovery refresh failed, keeping previous snapshot"
                            );
                        }
                    }
                }
            }
        });

        MappingRefresher {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }
}

impl ResourceMappingResolver for DiscoveryMapper {
    fn resource_mappings(&self, group: &str, kind: &str) -> Result<Vec<ResourceMapping>, BoxError> {
        match self.snapshot() {
            Some(snapshot) => snapshot.resource_mappings(group, kind),
            None => Err(Box::new(DiscoveryPending)),
        }
    }
}

/// Handle to the background discovery refresh task
///
/// Dropping the handle aborts the task; [`MappingRefresher::shutdown`] lets
/// an in-flight refresh finish first.
pub struct MappingRefresher {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MappingRefresher {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await
            && !e.is_cancelled()
        {
            tracing::warn!(error = %e, "discovery refresher task failed");
        }
    }
}

impl Drop for MappingRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
