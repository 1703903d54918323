use std::future::Future;
use std::pin::Pin;

use provctl_core::{Cluster, NodePool, State};

use crate::error::ProviderError;
use crate::plan::Plan;
use crate::planner::generate_plan;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A cloud backend that can create, change, and remove clusters and node
/// pools.
///
/// Implementations return the resource as the cloud now reports it. Status
/// bookkeeping belongs to the engine, so whatever phase a provider sets on
/// its return value is overwritten.
///
/// Methods return boxed futures for dyn compatibility.
pub trait CloudProvider: Send + Sync {
    /// Registry key, matched against `ResourceId::provider`.
    fn name(&self) -> &str;

    fn create_cluster<'a>(&'a self, cluster: &'a Cluster)
        -> BoxFuture<'a, Result<Cluster, ProviderError>>;

    fn update_cluster<'a>(&'a self, cluster: &'a Cluster)
        -> BoxFuture<'a, Result<Cluster, ProviderError>>;

    fn delete_cluster<'a>(&'a self, cluster_id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>>;

    /// Returns `Ok(None)` if the cluster doesn't exist.
    fn get_cluster<'a>(
        &'a self,
        cluster_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Cluster>, ProviderError>>;

    fn create_node_pool<'a>(&'a self, pool: &'a NodePool)
        -> BoxFuture<'a, Result<NodePool, ProviderError>>;

    fn update_node_pool<'a>(&'a self, pool: &'a NodePool)
        -> BoxFuture<'a, Result<NodePool, ProviderError>>;

    fn delete_node_pool<'a>(&'a self, pool_id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>>;

    /// What this provider currently runs for the clusters `desired` expects
    /// it to own. Clusters that no longer exist are simply absent.
    fn live_state<'a>(&'a self, desired: &'a State) -> BoxFuture<'a, Result<State, ProviderError>> {
        Box::pin(async move {
            let mut live = State::new();
            for (id, cluster) in &desired.clusters {
                if cluster.spec.provider != self.name() {
                    continue;
                }
                if let Some(found) = self.get_cluster(id).await? {
                    live.insert_cluster(found);
                }
            }
            Ok(live)
        })
    }

    /// The plan for the subset of `desired` and `actual` this provider owns.
    fn reconcile<'a>(
        &'a self,
        desired: &'a State,
        actual: &'a State,
    ) -> BoxFuture<'a, Result<Plan, ProviderError>> {
        Box::pin(async move {
            let name = self.name();
            Ok(generate_plan(
                &desired.for_provider(name),
                &actual.for_provider(name),
            ))
        })
    }
}
