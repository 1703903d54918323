use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use provctl_core::{Cluster, NodePool, Phase, ResourceKind, State, WorkerPoolSpec};

use crate::error::ProviderError;
use crate::provider::{BoxFuture, CloudProvider};

/// An in-process stand-in for a cloud.
///
/// Keeps its inventory as a `State`, optionally mirrored to a JSON file so
/// separate CLI invocations see the same cloud. Creates are upserts by id.
/// Creating a cluster brings up its declared worker pools, and node pool
/// operations keep the owning cluster's `workerPools` in sync, so the live
/// view the drift detector reads always matches what was provisioned.
pub struct SimulatedProvider {
    name: String,
    inventory: Mutex<State>,
    backing: Option<PathBuf>,
    failures: Mutex<BTreeSet<String>>,
    unavailable: AtomicBool,
}

impl SimulatedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inventory: Mutex::new(State::new()),
            backing: None,
            failures: Mutex::new(BTreeSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// A provider whose inventory lives in `path`. A missing file is an
    /// empty cloud.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let inventory = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::new(),
            Err(e) => return Err(e.into()),
        };

        let mut provider = Self::new(name);
        provider.inventory = Mutex::new(inventory);
        provider.backing = Some(path);
        Ok(provider)
    }

    pub fn backing_path(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    /// Make every operation on `id` fail until cleared.
    pub fn fail_on(&self, id: impl Into<String>) {
        lock(&self.failures).insert(id.into());
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Make every call fail as if the cloud API were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// A copy of everything currently running.
    pub fn inventory(&self) -> State {
        lock(&self.inventory).clone()
    }

    /// Change the cloud behind the engine's back.
    pub fn mutate_out_of_band(&self, f: impl FnOnce(&mut State)) -> Result<(), ProviderError> {
        let mut inventory = lock(&self.inventory);
        f(&mut inventory);
        self.persist(&inventory)
    }

    pub fn remove_cluster_out_of_band(&self, cluster_id: &str) -> Result<(), ProviderError> {
        self.mutate_out_of_band(|s| remove_cluster(s, cluster_id))
    }

    pub fn set_version_out_of_band(&self, cluster_id: &str, version: &str) -> Result<(), ProviderError> {
        self.mutate_out_of_band(|s| {
            if let Some(cluster) = s.clusters.get_mut(cluster_id) {
                cluster.spec.control_plane.version = version.to_string();
            }
        })
    }

    pub fn resize_pool_out_of_band(
        &self,
        cluster_id: &str,
        pool_name: &str,
        desired_size: u32,
    ) -> Result<(), ProviderError> {
        self.mutate_out_of_band(|s| {
            if let Some(cluster) = s.clusters.get_mut(cluster_id) {
                if let Some(pool) = cluster
                    .spec
                    .worker_pools
                    .iter_mut()
                    .find(|p| p.name == pool_name)
                {
                    pool.desired_size = desired_size;
                }
            }
            let id = provctl_core::node_pool_id(cluster_id, pool_name);
            if let Some(pool) = s.node_pools.get_mut(&id) {
                pool.spec.pool.desired_size = desired_size;
            }
        })
    }

    pub fn remove_pool_out_of_band(&self, cluster_id: &str, pool_name: &str) -> Result<(), ProviderError> {
        let id = provctl_core::node_pool_id(cluster_id, pool_name);
        self.mutate_out_of_band(|s| remove_node_pool(s, &id))
    }

    fn check(&self, kind: ResourceKind, id: &str) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(format!(
                "simulated provider {} is offline",
                self.name
            )));
        }
        if lock(&self.failures).contains(id) {
            return Err(ProviderError::Rejected {
                kind,
                id: id.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn persist(&self, inventory: &State) -> Result<(), ProviderError> {
        let Some(path) = &self.backing else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(inventory)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn put_cluster(&self, cluster: &Cluster, must_exist: bool) -> Result<Cluster, ProviderError> {
        self.check(ResourceKind::Cluster, &cluster.id)?;
        let mut inventory = lock(&self.inventory);
        if must_exist && !inventory.clusters.contains_key(&cluster.id) {
            return Err(ProviderError::NotFound {
                kind: ResourceKind::Cluster,
                id: cluster.id.clone(),
            });
        }

        let mut live = cluster.clone();
        live.status.phase = Phase::Running;
        for pool in &live.spec.worker_pools {
            let mut node_pool = NodePool::from_worker_pool(&live, pool);
            node_pool.status.phase = Phase::Running;
            inventory.insert_node_pool(node_pool);
        }
        inventory.insert_cluster(live.clone());
        self.persist(&inventory)?;

        tracing::debug!(provider = %self.name, cluster = %live.id, "simulated cluster written");
        Ok(live)
    }

    fn put_node_pool(&self, pool: &NodePool, must_exist: bool) -> Result<NodePool, ProviderError> {
        self.check(ResourceKind::NodePool, &pool.id)?;
        let mut inventory = lock(&self.inventory);
        if must_exist && !inventory.node_pools.contains_key(&pool.id) {
            return Err(ProviderError::NotFound {
                kind: ResourceKind::NodePool,
                id: pool.id.clone(),
            });
        }
        let Some(cluster) = inventory.clusters.get_mut(&pool.spec.cluster_id) else {
            return Err(ProviderError::NotFound {
                kind: ResourceKind::Cluster,
                id: pool.spec.cluster_id.clone(),
            });
        };

        upsert_worker_pool(&mut cluster.spec.worker_pools, &pool.spec.pool);
        let mut live = pool.clone();
        live.status.phase = Phase::Running;
        inventory.insert_node_pool(live.clone());
        self.persist(&inventory)?;

        tracing::debug!(provider = %self.name, node_pool = %live.id, "simulated node pool written");
        Ok(live)
    }

    fn drop_cluster(&self, cluster_id: &str) -> Result<(), ProviderError> {
        self.check(ResourceKind::Cluster, cluster_id)?;
        let mut inventory = lock(&self.inventory);
        if !inventory.clusters.contains_key(cluster_id) {
            tracing::debug!(provider = %self.name, cluster = %cluster_id, "cluster already gone");
        }
        remove_cluster(&mut inventory, cluster_id);
        self.persist(&inventory)
    }

    fn drop_node_pool(&self, pool_id: &str) -> Result<(), ProviderError> {
        self.check(ResourceKind::NodePool, pool_id)?;
        let mut inventory = lock(&self.inventory);
        if !inventory.node_pools.contains_key(pool_id) {
            tracing::debug!(provider = %self.name, node_pool = %pool_id, "node pool already gone");
        }
        remove_node_pool(&mut inventory, pool_id);
        self.persist(&inventory)
    }
}

impl CloudProvider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_cluster<'a>(&'a self, cluster: &'a Cluster) -> BoxFuture<'a, Result<Cluster, ProviderError>> {
        Box::pin(async move { self.put_cluster(cluster, false) })
    }

    fn update_cluster<'a>(&'a self, cluster: &'a Cluster) -> BoxFuture<'a, Result<Cluster, ProviderError>> {
        Box::pin(async move { self.put_cluster(cluster, true) })
    }

    fn delete_cluster<'a>(&'a self, cluster_id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move { self.drop_cluster(cluster_id) })
    }

    fn get_cluster<'a>(
        &'a self,
        cluster_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Cluster>, ProviderError>> {
        Box::pin(async move {
            self.check(ResourceKind::Cluster, cluster_id)?;
            Ok(lock(&self.inventory).clusters.get(cluster_id).cloned())
        })
    }

    fn create_node_pool<'a>(&'a self, pool: &'a NodePool) -> BoxFuture<'a, Result<NodePool, ProviderError>> {
        Box::pin(async move { self.put_node_pool(pool, false) })
    }

    fn update_node_pool<'a>(&'a self, pool: &'a NodePool) -> BoxFuture<'a, Result<NodePool, ProviderError>> {
        Box::pin(async move { self.put_node_pool(pool, true) })
    }

    fn delete_node_pool<'a>(&'a self, pool_id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move { self.drop_node_pool(pool_id) })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn upsert_worker_pool(pools: &mut Vec<WorkerPoolSpec>, pool: &WorkerPoolSpec) {
    match pools.iter_mut().find(|p| p.name == pool.name) {
        Some(existing) => *existing = pool.clone(),
        None => pools.push(pool.clone()),
    }
}

fn remove_cluster(inventory: &mut State, cluster_id: &str) {
    inventory.clusters.remove(cluster_id);
    inventory
        .node_pools
        .retain(|_, pool| pool.spec.cluster_id != cluster_id);
}

fn remove_node_pool(inventory: &mut State, pool_id: &str) {
    if let Some(pool) = inventory.node_pools.remove(pool_id) {
        if let Some(cluster) = inventory.clusters.get_mut(&pool.spec.cluster_id) {
            cluster
                .spec
                .worker_pools
                .retain(|p| p.name != pool.spec.pool.name);
        }
    }
}
