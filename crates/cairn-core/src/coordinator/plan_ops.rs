//! Plan operations for the Coordinator.

use log::debug;

use super::Coordinator;
use crate::{
    display::AdvanceResult,
    engine::{machine, revision},
    error::Result,
    events::PlanEvent,
    models::{Actor, Plan, Step},
    params::{CreatePlan, Revision},
};

impl Coordinator {
    /// Creates a plan with its full initial step set, atomically, in
    /// `planning` status. Emits a single `plan:created` event.
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::PermissionDenied` - The actor cannot edit
    /// * `CoordinatorError::InvalidInput` - Empty goal or steps, zero
    ///   parallelism, duplicate ids, or a dependency that is unknown or cyclic
    pub async fn create_plan(&self, params: &CreatePlan, actor: &Actor) -> Result<Plan> {
        let params = params.clone();
        let actor = actor.clone();
        let default_max_parallel = self.inner.default_max_parallel;

        let plan = self
            .with_db(move |db| {
                db.atomically(|db| machine::create_plan(db, &params, &actor, default_max_parallel))
            })
            .await?;

        self.inner.sink.publish(&PlanEvent::PlanCreated {
            plan: plan.clone(),
            steps: plan.steps.clone(),
        });
        Ok(plan)
    }

    /// Approves a plan that is still being planned. Starts runnable steps
    /// right away when auto-advance is on and an executor is registered.
    pub async fn approve(&self, plan_id: &str, actor: &Actor) -> Result<Plan> {
        let (id, actor) = (plan_id.to_string(), actor.clone());
        let (_, transition) = self
            .transact(plan_id, move |s| machine::approve(s, &id, &actor))
            .await?;
        Ok(transition.plan)
    }

    /// Rejects a plan that is still being planned.
    pub async fn reject(&self, plan_id: &str, actor: &Actor) -> Result<Plan> {
        let (id, actor) = (plan_id.to_string(), actor.clone());
        let (_, transition) = self
            .transact(plan_id, move |s| machine::reject(s, &id, &actor))
            .await?;
        Ok(transition.plan)
    }

    /// Cancels a plan that has not completed. Steps already running are not
    /// interrupted; their late results are ignored.
    pub async fn cancel(&self, plan_id: &str, actor: &Actor) -> Result<Plan> {
        let (id, actor) = (plan_id.to_string(), actor.clone());
        let (_, transition) = self
            .transact(plan_id, move |s| machine::cancel(s, &id, &actor))
            .await?;
        Ok(transition.plan)
    }

    /// Starts at most one runnable step of an executing or paused plan.
    ///
    /// With an executor registered the step is dispatched to it; otherwise
    /// the caller runs the action and reports back through
    /// [`Coordinator::complete_step`] or [`Coordinator::fail_step`].
    pub async fn advance(&self, plan_id: &str, actor: &Actor) -> Result<AdvanceResult> {
        let (id, actor) = (plan_id.to_string(), actor.clone());
        let (step, transition) = self
            .transact(plan_id, move |s| machine::advance(s, &id, &actor))
            .await?;
        Ok(AdvanceResult {
            plan: transition.plan,
            step,
        })
    }

    /// Turns auto-advance on or off for a plan that has not ended.
    pub async fn set_auto_advance(
        &self,
        plan_id: &str,
        actor: &Actor,
        enabled: bool,
    ) -> Result<Plan> {
        let (id, actor) = (plan_id.to_string(), actor.clone());
        let (_, transition) = self
            .transact(plan_id, move |s| {
                machine::set_auto_advance(s, &id, &actor, enabled)
            })
            .await?;
        Ok(transition.plan)
    }

    /// Edits a step that has not run yet. Returns the updated, skipped or
    /// inserted step.
    pub async fn apply_revision(
        &self,
        plan_id: &str,
        actor: &Actor,
        change: &Revision,
    ) -> Result<Step> {
        let (id, actor, change) = (plan_id.to_string(), actor.clone(), change.clone());
        debug!("applying {} to plan {plan_id}", change.name());
        let (step, _) = self
            .transact(plan_id, move |s| {
                revision::apply_revision(s, &id, &actor, &change)
            })
            .await?;
        Ok(step)
    }

    /// Applies a batch of revisions in one transaction, in order. Either all
    /// of them land or, when one fails, none do.
    pub async fn apply_revisions(
        &self,
        plan_id: &str,
        actor: &Actor,
        changes: &[Revision],
    ) -> Result<Vec<Step>> {
        let (id, actor, changes) = (plan_id.to_string(), actor.clone(), changes.to_vec());
        debug!("applying {} revisions to plan {plan_id}", changes.len());
        let (steps, _) = self
            .transact(plan_id, move |s| {
                changes
                    .iter()
                    .map(|change| revision::apply_revision(s, &id, &actor, change))
                    .collect::<Result<Vec<_>>>()
            })
            .await?;
        Ok(steps)
    }

    /// Retrieves a plan with its steps.
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::PlanNotFound` - No plan has this id
    pub async fn get_plan(&self, plan_id: &str) -> Result<Plan> {
        let id = plan_id.to_string();
        self.with_db(move |db| db.require_plan(&id)).await
    }

    /// The most recently created plan of a workspace that is still planning,
    /// executing or paused.
    pub async fn get_active_plan(&self, workspace: &str) -> Result<Option<Plan>> {
        let workspace = workspace.to_string();
        self.with_db(move |db| db.find_active_plan(&workspace))
            .await
    }
}
