//! Auto-advance: fill free concurrency slots with runnable steps.

use log::{debug, info};

use super::{resolver, Session};
use crate::{
    error::Result,
    models::{PlanStatus, Step, StepStatus},
};

/// Starts as many runnable steps as the plan has free slots and queues them
/// for dispatch. Returns the started steps in dispatch order.
///
/// Does nothing unless an executor is registered, auto-advance is on and
/// the plan is executing or paused.
pub fn run(session: &mut Session<'_>, plan_id: &str) -> Result<Vec<Step>> {
    if !session.dispatch_enabled() {
        return Ok(Vec::new());
    }

    let plan = session.db.require_plan(plan_id)?;
    if !plan.auto_advance || !plan.status.is_running() {
        return Ok(Vec::new());
    }

    let slots = plan.available_slots();
    if slots == 0 {
        debug!("plan {plan_id} has no free slot");
        return Ok(Vec::new());
    }

    let selected: Vec<String> = resolver::executable_steps(&plan.steps, slots as usize)
        .into_iter()
        .map(|step| step.id.clone())
        .collect();
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    if plan.status == PlanStatus::Paused {
        info!("plan {plan_id} resumes executing");
        session.set_plan_status(plan_id, PlanStatus::Executing)?;
    }

    let mut started = Vec::with_capacity(selected.len());
    for id in selected {
        let step = session
            .db
            .transition_step(&id, StepStatus::Pending, StepStatus::InProgress)?;
        session.set_status_and_index(plan_id, PlanStatus::Executing, step.step_index)?;
        debug!("scheduled step {id} of plan {plan_id}");
        session.record_updated(step.clone());
        session.dispatch(step.clone());
        started.push(step);
    }

    Ok(started)
}
