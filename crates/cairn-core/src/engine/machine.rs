//! Plan and step state machine.
//!
//! Each operation validates the current state, mutates the store through the
//! session, and hands over to the scheduler or the unblock propagator where
//! the rules call for it.

use jiff::Timestamp;
use log::{debug, info, warn};
use uuid::Uuid;

use super::{graph, resolver, scheduler, unblock, Session};
use crate::{
    db::{Database, NewPlan},
    error::{CoordinatorError, Result},
    models::{Actor, Dependencies, Plan, PlanStatus, Step, StepStatus},
    params::CreatePlan,
};

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Creates a plan and its full initial step set in `planning` status.
///
/// Steps are indexed 0..N-1 in the order given. Plan creation is not
/// recorded in a session: the caller broadcasts the returned plan as a
/// single creation event.
pub fn create_plan(
    db: &Database,
    params: &CreatePlan,
    actor: &Actor,
    default_max_parallel: u32,
) -> Result<Plan> {
    actor.require_edit()?;
    params.validate()?;

    let plan_id = params.id.clone().unwrap_or_else(generate_id);
    if db.plan_exists(&plan_id)? {
        return Err(CoordinatorError::invalid_input("id")
            .with_reason(format!("plan '{plan_id}' already exists")));
    }

    let step_ids: Vec<String> = params
        .steps
        .iter()
        .map(|draft| draft.id.clone().unwrap_or_else(generate_id))
        .collect();
    let nodes: Vec<graph::Node<'_>> = step_ids
        .iter()
        .zip(&params.steps)
        .map(|(id, draft)| graph::Node {
            id,
            depends_on: &draft.depends_on,
        })
        .collect();
    graph::validate(&nodes)?;

    for id in &step_ids {
        if db.step_exists(id)? {
            return Err(CoordinatorError::invalid_input("steps")
                .with_reason(format!("step '{id}' already exists")));
        }
    }

    let now = Timestamp::now();
    db.insert_plan(&NewPlan {
        id: plan_id.clone(),
        workspace: params.workspace.clone(),
        goal: params.goal.clone(),
        created_by: actor.id.clone(),
        auto_advance: params.auto_advance,
        max_parallel: params.max_parallel.unwrap_or(default_max_parallel),
        created_at: now,
    })?;

    for (index, (id, draft)) in (0u32..).zip(step_ids.into_iter().zip(&params.steps)) {
        db.insert_step(&Step {
            id,
            plan_id: plan_id.clone(),
            step_index: index,
            position: index,
            description: draft.description.clone(),
            action: draft.action.clone(),
            params: draft.params.clone(),
            depends_on: Dependencies::from(draft.depends_on.clone()),
            status: StepStatus::Pending,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })?;
    }

    info!(
        "created plan {plan_id} with {} steps in workspace {}",
        params.steps.len(),
        params.workspace
    );
    db.require_plan(&plan_id)
}

/// planning → executing, then fills slots when auto-advance is on.
pub fn approve(session: &mut Session<'_>, plan_id: &str, actor: &Actor) -> Result<()> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if plan.status != PlanStatus::Planning {
        return Err(CoordinatorError::plan_transition(plan_id, plan.status, "approve"));
    }

    session.set_plan_status(plan_id, PlanStatus::Executing)?;
    info!("plan {plan_id} approved by {}", actor.id);
    scheduler::run(session, plan_id)?;
    Ok(())
}

/// planning → cancelled.
pub fn reject(session: &mut Session<'_>, plan_id: &str, actor: &Actor) -> Result<()> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if plan.status != PlanStatus::Planning {
        return Err(CoordinatorError::plan_transition(plan_id, plan.status, "reject"));
    }

    session.set_plan_status(plan_id, PlanStatus::Cancelled)?;
    info!("plan {plan_id} rejected by {}", actor.id);
    Ok(())
}

/// Any non-terminal status → cancelled. In-flight executions keep running;
/// their results are ignored when they arrive.
pub fn cancel(session: &mut Session<'_>, plan_id: &str, actor: &Actor) -> Result<()> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if plan.status.is_terminal() {
        return Err(CoordinatorError::plan_transition(plan_id, plan.status, "cancel"));
    }

    session.set_plan_status(plan_id, PlanStatus::Cancelled)?;
    info!(
        "plan {plan_id} cancelled by {} with {} step(s) in flight",
        actor.id, plan.active_step_count
    );
    Ok(())
}

/// Starts at most one runnable step.
///
/// Returns `None` when the plan is at capacity, when every remaining step
/// waits on a dependency, or when nothing is left (the plan then completes).
pub fn advance(session: &mut Session<'_>, plan_id: &str, actor: &Actor) -> Result<Option<Step>> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if !plan.status.is_running() {
        return Err(CoordinatorError::plan_transition(plan_id, plan.status, "advance"));
    }
    advance_once(session, &plan)
}

fn advance_once(session: &mut Session<'_>, plan: &Plan) -> Result<Option<Step>> {
    if plan.available_slots() == 0 {
        debug!("plan {} is at capacity", plan.id);
        return Ok(None);
    }

    let Some(next) = resolver::executable_steps(&plan.steps, 1).into_iter().next() else {
        if !resolver::has_work_left(&plan.steps) {
            info!("plan {} has no work left; completing", plan.id);
            session.set_plan_status(&plan.id, PlanStatus::Completed)?;
        }
        return Ok(None);
    };

    let step = session
        .db
        .transition_step(&next.id, StepStatus::Pending, StepStatus::InProgress)?;
    session.set_status_and_index(&plan.id, PlanStatus::Executing, step.step_index)?;
    debug!("advanced plan {} to step {}", plan.id, step.id);
    session.record_updated(step.clone());
    session.dispatch(step.clone());
    Ok(Some(step))
}

/// Loads the step and its plan for a late-tolerant executor callback.
///
/// `None` means the plan already ended and the callback is ignored.
fn callback_target(session: &Session<'_>, step_id: &str) -> Result<Option<(Step, Plan)>> {
    let step = session.db.require_step(step_id)?;
    let plan = session.db.require_plan(&step.plan_id)?;
    if plan.status.is_terminal() {
        info!(
            "ignoring late result for step {step_id}: plan {} is {}",
            plan.id, plan.status
        );
        return Ok(None);
    }
    Ok(Some((step, plan)))
}

/// in_progress → completed. Releases dependents, then settles the plan.
///
/// Returns `None` when the plan already ended.
pub fn complete_step(
    session: &mut Session<'_>,
    step_id: &str,
    result: &serde_json::Value,
) -> Result<Option<Step>> {
    let Some((step, plan)) = callback_target(session, step_id)? else {
        return Ok(None);
    };
    if step.status != StepStatus::InProgress {
        return Err(CoordinatorError::step_transition(step_id, step.status, "complete"));
    }

    let completed = session.db.set_step_result(step_id, result)?;
    debug!("step {step_id} completed");
    session.record_updated(completed.clone());
    unblock::propagate(session, &plan.id, step_id)?;
    settle_after_completion(session, &plan.id)?;
    Ok(Some(completed))
}

/// Recomputes the plan status after a step completed. A failed step keeps
/// the plan from completing; it pauses instead so the step can be retried.
fn settle_after_completion(session: &mut Session<'_>, plan_id: &str) -> Result<()> {
    let plan = session.db.require_plan(plan_id)?;
    let next = if !resolver::has_work_left(&plan.steps) {
        PlanStatus::Completed
    } else if plan.auto_advance && !resolver::executable_steps(&plan.steps, 1).is_empty() {
        PlanStatus::Executing
    } else {
        PlanStatus::Paused
    };

    if next != plan.status {
        info!("plan {plan_id} is now {next}");
        session.set_plan_status(plan_id, next)?;
    }
    if next == PlanStatus::Executing {
        scheduler::run(session, plan_id)?;
    }
    Ok(())
}

/// in_progress → failed. Blocks direct pending dependents and pauses the
/// plan for a human to retry, skip or cancel.
///
/// Returns the failed step and the dependents it blocked, or `None` when the
/// plan already ended.
pub fn fail_step(
    session: &mut Session<'_>,
    step_id: &str,
    message: &str,
) -> Result<Option<(Step, Vec<Step>)>> {
    let Some((step, plan)) = callback_target(session, step_id)? else {
        return Ok(None);
    };
    if step.status != StepStatus::InProgress {
        return Err(CoordinatorError::step_transition(step_id, step.status, "fail"));
    }

    let failed = session.db.set_step_error(step_id, message)?;
    warn!("step {step_id} of plan {} failed: {message}", plan.id);
    session.record_updated(failed.clone());

    let mut blocked = Vec::new();
    for dependent in plan
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Pending && s.depends_on.contains(step_id))
    {
        let step = session.db.transition_step(
            &dependent.id,
            StepStatus::Pending,
            StepStatus::Blocked,
        )?;
        debug!("step {} blocked by failure of {step_id}", step.id);
        session.record_updated(step.clone());
        blocked.push(step);
    }

    if plan.status != PlanStatus::Paused {
        session.set_plan_status(&plan.id, PlanStatus::Paused)?;
    }

    Ok(Some((failed, blocked)))
}

/// pending/blocked → skipped. Releases dependents and either completes the
/// plan or lets the scheduler fill the freed slot.
pub fn skip_step(session: &mut Session<'_>, step_id: &str) -> Result<Step> {
    let step = session.db.require_step(step_id)?;
    let plan = session.db.require_plan(&step.plan_id)?;
    if plan.status.is_terminal() {
        return Err(CoordinatorError::plan_transition(
            &plan.id,
            plan.status,
            "skip steps of",
        ));
    }
    if !step.status.is_revisable() {
        return Err(CoordinatorError::step_transition(step_id, step.status, "skip"));
    }

    let skipped = session
        .db
        .transition_step(step_id, step.status, StepStatus::Skipped)?;
    debug!("step {step_id} skipped");
    session.record_updated(skipped.clone());
    unblock::propagate(session, &plan.id, step_id)?;

    let plan = session.db.require_plan(&plan.id)?;
    if plan.status.is_running() && !resolver::has_work_left(&plan.steps) {
        info!("plan {} has no work left after skip; completing", plan.id);
        session.set_plan_status(&plan.id, PlanStatus::Completed)?;
    } else {
        scheduler::run(session, &plan.id)?;
    }
    Ok(skipped)
}

/// failed → pending, then attempts one advance.
///
/// Dependents blocked by the failure stay blocked until the retried step
/// completes. Returns the step that the advance started, if any.
pub fn retry_step(session: &mut Session<'_>, step_id: &str) -> Result<Option<Step>> {
    let step = session.db.require_step(step_id)?;
    let plan = session.db.require_plan(&step.plan_id)?;
    if plan.status.is_terminal() {
        return Err(CoordinatorError::plan_transition(
            &plan.id,
            plan.status,
            "retry steps of",
        ));
    }
    if step.status != StepStatus::Failed {
        return Err(CoordinatorError::step_transition(step_id, step.status, "retry"));
    }

    let reset = session.db.reset_failed_step(step_id)?;
    debug!("step {step_id} reset for retry");
    session.record_updated(reset);

    if matches!(plan.status, PlanStatus::Failed | PlanStatus::Paused) {
        session.set_plan_status(&plan.id, PlanStatus::Executing)?;
    }

    let plan = session.db.require_plan(&plan.id)?;
    if !plan.status.is_running() {
        return Ok(None);
    }
    let advanced = advance_once(session, &plan)?;
    scheduler::run(session, &plan.id)?;
    Ok(advanced)
}

/// Turns auto-advance on or off. Turning it on for a running plan fills
/// free slots right away.
pub fn set_auto_advance(
    session: &mut Session<'_>,
    plan_id: &str,
    actor: &Actor,
    enabled: bool,
) -> Result<()> {
    actor.require_edit()?;
    let plan = session.db.require_plan(plan_id)?;
    if plan.status.is_terminal() {
        return Err(CoordinatorError::plan_transition(
            plan_id,
            plan.status,
            "change auto-advance of",
        ));
    }

    if plan.auto_advance != enabled {
        session.set_auto_advance(plan_id, enabled)?;
        info!("plan {plan_id} auto-advance set to {enabled}");
    }
    if enabled && plan.status.is_running() {
        scheduler::run(session, plan_id)?;
    }
    Ok(())
}
