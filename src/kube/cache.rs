//! Reflector-backed cache of well-known workload controllers
//!
//! One `kube::runtime::reflector` store per enabled kind, each fed by its own
//! watcher task. The stores are what [`WellKnownResolver`] reads from.
//!
//! [`WellKnownResolver`]: crate::fetcher::WellKnownResolver

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ReplicationController;
use kube::core::NamespaceResourceScope;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, Resource};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::fetcher::{BoxError, ObjectCache, WellKnownObject};
use crate::models::{WellKnownKind, WellKnownKinds};

/// Raised when the cache is asked for a kind it does not mirror
#[derive(Debug, thiserror::Error)]
#[error("no cache is running for {0}")]
pub struct CacheDisabled(pub WellKnownKind);

/// Reader halves of the per-kind reflector stores
#[derive(Clone)]
pub struct WorkloadStores {
    pub daemon_sets: Store<DaemonSet>,
    pub deployments: Store<Deployment>,
    pub replica_sets: Store<ReplicaSet>,
    pub stateful_sets: Store<StatefulSet>,
    pub replication_controllers: Store<ReplicationController>,
    pub jobs: Store<Job>,
}

/// Local mirror of the well-known controllers, keyed by namespace/name
pub struct WorkloadCache {
    kinds: WellKnownKinds,
    stores: WorkloadStores,
    handles: Vec<(WellKnownKind, JoinHandle<()>)>,
}

impl WorkloadCache {
    /// Wrap stores that are fed elsewhere
    pub fn new(kinds: WellKnownKinds, stores: WorkloadStores) -> Self {
        Self {
            kinds,
            stores,
            handles: Vec::new(),
        }
    }

    /// Start a watcher per enabled kind
    ///
    /// Uses Api::namespaced if namespace is set, Api::all otherwise.
    /// Call [`WorkloadCache::wait_for_sync`] before resolving anything.
    pub fn start(client: Client, namespace: Option<&str>, kinds: WellKnownKinds) -> Self {
        let mut handles = Vec::new();

        macro_rules! store {
            ($kind:expr, $type:ty) => {{
                if kinds.contains($kind) {
                    let (store, handle) =
                        spawn_reflector::<$type>(namespaced_api(&client, namespace), $kind);
                    handles.push(($kind, handle));
                    store
                } else {
                    reflector::store::<$type>().0
                }
            }};
        }

        let stores = WorkloadStores {
            daemon_sets: store!(WellKnownKind::DaemonSet, DaemonSet),
            deployments: store!(WellKnownKind::Deployment, Deployment),
            replica_sets: store!(WellKnownKind::ReplicaSet, ReplicaSet),
            stateful_sets: store!(WellKnownKind::StatefulSet, StatefulSet),
            replication_controllers: store!(
                WellKnownKind::ReplicationController,
                ReplicationController
            ),
            jobs: store!(WellKnownKind::Job, Job),
        };

        tracing::debug!(
            kinds = handles.len(),
            namespace = namespace.unwrap_or("<all>"),
            "started workload reflectors"
        );

        Self {
            kinds,
            stores,
            handles,
        }
    }

    /// Wait for the initial list of every enabled kind, up to `timeout` in total
    ///
    /// Returns the kinds that did not sync in time. Lookups of those kinds may
    /// report objects as missing until they catch up.
    pub async fn wait_for_sync(&self, timeout: Duration) -> Vec<WellKnownKind> {
        let deadline = Instant::now() + timeout;
        let mut unsynced = Vec::new();

        for kind in self.kinds.iter() {
            let synced = match kind {
                WellKnownKind::DaemonSet => wait_ready(&self.stores.daemon_sets, deadline).await,
                WellKnownKind::Deployment => wait_ready(&self.stores.deployments, deadline).await,
                WellKnownKind::ReplicaSet => wait_ready(&self.stores.replica_sets, deadline).await,
                WellKnownKind::StatefulSet => {
                    wait_ready(&self.stores.stateful_sets, deadline).await
                }
                WellKnownKind::ReplicationController => {
                    wait_ready(&self.stores.replication_controllers, deadline).await
                }
                WellKnownKind::Job => wait_ready(&self.stores.jobs, deadline).await,
            };

            if synced {
                tracing::info!(%kind, "initial sync completed");
            } else {
                tracing::warn!(%kind, ?timeout, "could not sync cache");
                unsynced.push(kind);
            }
        }

        unsynced
    }

    /// Abort all watcher tasks
    pub fn stop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
        self.handles.clear();
    }
}

impl Drop for WorkloadCache {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ObjectCache for WorkloadCache {
    fn get(
        &self,
        kind: WellKnownKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<WellKnownObject>, BoxError> {
        if !self.kinds.contains(kind) {
            return Err(Box::new(CacheDisabled(kind)));
        }

        let obj = match kind {
            WellKnownKind::DaemonSet => {
                lookup(&self.stores.daemon_sets, namespace, name).map(WellKnownObject::from)
            }
            WellKnownKind::Deployment => {
                lookup(&self.stores.deployments, namespace, name).map(WellKnownObject::from)
            }
            WellKnownKind::ReplicaSet => {
                lookup(&self.stores.replica_sets, namespace, name).map(WellKnownObject::from)
            }
            WellKnownKind::StatefulSet => {
                lookup(&self.stores.stateful_sets, namespace, name).map(WellKnownObject::from)
            }
            WellKnownKind::ReplicationController => {
                lookup(&self.stores.replication_controllers, namespace, name)
                    .map(WellKnownObject::from)
            }
            WellKnownKind::Job => {
                lookup(&self.stores.jobs, namespace, name).map(WellKnownObject::from)
            }
        };

        Ok(obj)
    }
}

fn lookup<K>(store: &Store<K>, namespace: &str, name: &str) -> Option<Arc<K>>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    store.get(&ObjectRef::new(name).within(namespace))
}

async fn wait_ready<K>(store: &Store<K>, deadline: Instant) -> bool
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    matches!(
        tokio::time::timeout_at(deadline, store.wait_until_ready()).await,
        Ok(Ok(()))
    )
}

fn namespaced_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Spawn a reflector feeding a fresh store from `api`
fn spawn_reflector<K>(api: Api<K>, kind: WellKnownKind) -> (Store<K>, JoinHandle<()>)
where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + Send
        + Sync
        + serde::de::DeserializeOwned
        + 'static,
{
    let (reader, writer) = reflector::store();
    let stream = reflector::reflector(
        writer,
        watcher(api, watcher::Config::default()).default_backoff(),
    );

    let handle = tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        let mut error_count = 0u32;

        loop {
            match stream.try_next().await {
                Ok(Some(_)) => {
                    error_count = 0;
                }
                Ok(None) => {
                    tracing::warn!(%kind, "reflector stream terminated");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    // Only log errors occasionally to avoid spam; backoff handles the retry
                    if error_count == 1 || error_count.is_multiple_of(10) {
                        tracing::warn!(%kind, error = %e, error_count, "watch error, retrying");
                    }
                }
            }
        }
    });

    (reader, handle)
}
