use std::sync::Arc;

use provctl_audit::EventStore;
use provctl_core::{
    Condition, ConditionType, Event, EventKind, Phase, Resource, ResourceId, ResourceKind,
    ResourceMetadata, ResourceRecord, ResourceStatus, State,
};
use provctl_storage::{StateManager, StateTransaction};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{format_err_chain, EngineError, ProviderError};
use crate::plan::{Action, ActionKind, ActionType, Plan};
use crate::planner::Planner;
use crate::provider::CloudProvider;
use crate::registry::ProviderRegistry;

const DEFAULT_ACTOR: &str = "provctl";

/// What an applied plan did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Ids of the audit events recorded for this apply, in action order.
    pub events: Vec<Uuid>,
}

impl ApplySummary {
    pub fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn count(&mut self, action_type: ActionType) {
        match action_type {
            ActionType::Create => self.created += 1,
            ActionType::Update => self.updated += 1,
            ActionType::Delete => self.deleted += 1,
            ActionType::Noop => self.unchanged += 1,
        }
    }
}

/// Applies plans through cloud providers, keeping persisted state and the
/// audit log consistent with what the providers did.
pub struct Engine {
    registry: ProviderRegistry,
    state: Arc<dyn StateManager>,
    events: Arc<dyn EventStore>,
    planner: Planner,
    actor: String,
}

impl Engine {
    pub fn new(state: Arc<dyn StateManager>, events: Arc<dyn EventStore>) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            state,
            events,
            planner: Planner::default(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_planner(mut self, planner: Planner) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.register_provider(provider);
        self
    }

    pub fn register_provider(&mut self, provider: Arc<dyn CloudProvider>) {
        if let Some(replaced) = self.registry.register(provider) {
            tracing::warn!(provider = %replaced.name(), "replaced previously registered provider");
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn state_manager(&self) -> &Arc<dyn StateManager> {
        &self.state
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Plan `desired` against the persisted state without changing anything.
    pub async fn plan(&self, desired: &State) -> Result<Plan, EngineError> {
        desired.validate()?;
        let actual = self.state.get_state().await?;
        Ok(self.planner.plan(desired, &actual))
    }

    /// Bring persisted state (and the clouds behind it) in line with
    /// `desired`. The state lock is held from the read through the commit.
    pub async fn reconcile(&self, desired: &State) -> Result<ApplySummary, EngineError> {
        desired.validate()?;
        let lock = self.state.lock().await?;
        let actual = self.state.get_state().await?;
        let plan = self.planner.plan(desired, &actual);

        let summary = if plan.has_changes() {
            tracing::info!(
                creates = plan.count(ActionType::Create),
                updates = plan.count(ActionType::Update),
                deletes = plan.count(ActionType::Delete),
                "executing reconciliation plan"
            );
            self.apply(&plan).await?
        } else {
            tracing::info!("all resources in sync, no changes needed");
            ApplySummary::default()
        };

        lock.unlock();
        Ok(summary)
    }

    /// Execute `plan` inside a state transaction.
    ///
    /// Actions run strictly in plan order. The first failure aborts the
    /// plan: the transaction is rolled back, so persisted state keeps its
    /// previous value even though earlier provider calls already happened.
    /// A provider failure additionally records one `Failed` event.
    ///
    /// State is committed first and the staged events are then appended as
    /// one batch. A failed commit writes no events; a failed append puts the
    /// previous state back. Either way replaying the log keeps matching the
    /// persisted state.
    ///
    /// Callers that read state to build `plan` should hold the state lock
    /// across the read and this call.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplySummary, EngineError> {
        let mut tx = StateTransaction::begin(self.state.as_ref()).await?;
        let mut staged = Vec::with_capacity(plan.len());
        let mut summary = ApplySummary::default();

        if let Err(e) = self.execute(plan, &mut tx, &mut staged, &mut summary).await {
            tx.rollback();
            if let EngineError::Provider { resource, .. } = &e {
                self.record_failure(resource, &e).await;
            }
            return Err(e);
        }

        let base = tx.base().clone();
        tx.commit()
            .await
            .map_err(|e| EngineError::transaction("saving state", e))?;

        if let Err(e) = self.events.record_events(&staged).await {
            tracing::error!(
                count = staged.len(),
                error = %e,
                "failed to record audit events, restoring previous state"
            );
            if let Err(restore) = self.state.save_state(&base).await {
                tracing::error!(
                    error = %restore,
                    "failed to restore previous state, state is ahead of the event log"
                );
            }
            return Err(EngineError::transaction("recording audit events", e));
        }

        summary.events = staged.iter().map(|e| e.id).collect();
        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "plan applied"
        );
        Ok(summary)
    }

    async fn execute(
        &self,
        plan: &Plan,
        tx: &mut StateTransaction<'_>,
        staged: &mut Vec<Event>,
        summary: &mut ApplySummary,
    ) -> Result<(), EngineError> {
        for action in plan.actions() {
            let action_type = action.action_type();
            if action_type != ActionType::Noop {
                let provider = self.registry.resolve(&action.resource)?;
                tracing::info!(
                    resource = %action.resource,
                    action = ?action_type,
                    "applying action"
                );
                if let Some(outcome) = self.dispatch(provider.as_ref(), action, tx.state_mut()).await? {
                    staged.push(Event::new(action.resource.clone(), &self.actor, outcome));
                }
            }
            summary.count(action_type);
        }
        Ok(())
    }

    /// Run one action against its provider and mirror the result into the
    /// working state. Returns the event to record, if any.
    async fn dispatch(
        &self,
        provider: &dyn CloudProvider,
        action: &Action,
        working: &mut State,
    ) -> Result<Option<EventKind>, EngineError> {
        let resource = &action.resource;
        let failed = |source: ProviderError| EngineError::provider(resource, source);

        match &action.kind {
            ActionKind::Create { desired } => {
                let mut pending = desired.clone();
                *pending.status_mut() = ResourceStatus::default();
                transition(pending.status_mut(), resource, Phase::Provisioning);
                working.upsert(pending.clone());

                let mut created = match pending {
                    ResourceRecord::Cluster(cluster) => {
                        let mut c = provider.create_cluster(&cluster).await.map_err(failed)?;
                        c.status = cluster.status;
                        ResourceRecord::Cluster(c)
                    }
                    ResourceRecord::NodePool(pool) => {
                        let mut p = provider.create_node_pool(&pool).await.map_err(failed)?;
                        p.status = pool.status;
                        ResourceRecord::NodePool(p)
                    }
                };

                let now = jiff::Timestamp::now();
                let metadata = created.metadata_mut();
                metadata.created_at = Some(now);
                metadata.updated_at = Some(now);
                mark_running(created.status_mut(), resource);
                working.upsert(created.clone());
                Ok(Some(EventKind::Created(created)))
            }

            ActionKind::Update { desired, .. } => {
                let mut pending = desired.clone();
                carry_over(&mut pending, working);
                transition(pending.status_mut(), resource, Phase::Updating);
                working.upsert(pending.clone());

                let mut updated = match pending {
                    ResourceRecord::Cluster(cluster) => {
                        let mut c = provider.update_cluster(&cluster).await.map_err(failed)?;
                        c.status = cluster.status;
                        c.metadata.created_at = cluster.metadata.created_at;
                        ResourceRecord::Cluster(c)
                    }
                    ResourceRecord::NodePool(pool) => {
                        let mut p = provider.update_node_pool(&pool).await.map_err(failed)?;
                        p.status = pool.status;
                        p.metadata.created_at = pool.metadata.created_at;
                        ResourceRecord::NodePool(p)
                    }
                };

                updated.metadata_mut().updated_at = Some(jiff::Timestamp::now());
                mark_running(updated.status_mut(), resource);
                working.upsert(updated.clone());
                Ok(Some(EventKind::Updated(updated)))
            }

            ActionKind::Delete => {
                if let Some(mut existing) = working.remove(resource.kind, &resource.id) {
                    transition(existing.status_mut(), resource, Phase::Deleting);
                    working.upsert(existing);
                }

                match resource.kind {
                    ResourceKind::Cluster => {
                        provider.delete_cluster(&resource.id).await.map_err(failed)?;
                    }
                    ResourceKind::NodePool => {
                        provider.delete_node_pool(&resource.id).await.map_err(failed)?;
                    }
                }

                working.remove(resource.kind, &resource.id);
                Ok(Some(EventKind::Deleted))
            }

            ActionKind::Noop => Ok(None),
        }
    }

    /// Best effort: the plan has already failed, so a write error here is
    /// only logged. The state was rolled back, so this event is the only
    /// place the failed phase is recorded.
    async fn record_failure(&self, resource: &ResourceId, error: &EngineError) {
        let event = Event::new(
            resource.clone(),
            &self.actor,
            EventKind::Failed {
                error: format_err_chain(error),
            },
        );
        tracing::error!(
            resource = %resource,
            phase = %Phase::Failed,
            error = %format_err_chain(error),
            "action failed"
        );
        if let Err(e) = self.events.record_event(&event).await {
            tracing::warn!(resource = %resource, error = %e, "failed to record failure event");
        }
    }
}

/// Keep the creation time, status, and annotations the working state already
/// has for the resource being updated.
fn carry_over(pending: &mut ResourceRecord, working: &State) {
    match pending {
        ResourceRecord::Cluster(desired) => {
            if let Some(existing) = working.clusters.get(&desired.id) {
                inherit(&mut desired.metadata, &mut desired.status, existing);
            }
        }
        ResourceRecord::NodePool(desired) => {
            if let Some(existing) = working.node_pools.get(&desired.id) {
                inherit(&mut desired.metadata, &mut desired.status, existing);
            }
        }
    }
}

fn inherit<T>(
    metadata: &mut ResourceMetadata,
    status: &mut ResourceStatus,
    existing: &Resource<T>,
) {
    metadata.created_at = existing.metadata.created_at;
    *status = existing.status.clone();
}

fn transition(status: &mut ResourceStatus, resource: &ResourceId, next: Phase) {
    if !status.phase.can_transition_to(next) {
        tracing::debug!(
            resource = %resource,
            from = %status.phase,
            to = %next,
            "forcing phase transition"
        );
    }
    status.phase = next;
    status.message = None;
}

fn mark_running(status: &mut ResourceStatus, resource: &ResourceId) {
    transition(status, resource, Phase::Running);
    status.set_condition(Condition::new(ConditionType::Ready, true).with_reason("Reconciled"));
}
