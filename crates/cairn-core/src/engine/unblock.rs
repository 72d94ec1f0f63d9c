//! Releasing blocked steps once a dependency resolves.

use std::collections::HashMap;

use log::{debug, warn};

use super::Session;
use crate::{
    error::Result,
    models::{Step, StepStatus},
};

/// Reverse dependency index: step id → steps that depend on it.
///
/// Built once per loaded plan so that propagation does not rescan every
/// step's dependency list per resolved step.
pub struct Dependents<'a> {
    by_dependency: HashMap<&'a str, Vec<&'a Step>>,
}

impl<'a> Dependents<'a> {
    pub fn build(steps: &'a [Step]) -> Self {
        let mut by_dependency: HashMap<&'a str, Vec<&'a Step>> = HashMap::new();
        for step in steps {
            if step.depends_on.is_malformed() {
                warn!(
                    "step {} has malformed depends_on; no dependencies to re-check",
                    step.id
                );
                continue;
            }
            for dep in step.depends_on.ids() {
                by_dependency.entry(dep.as_str()).or_default().push(step);
            }
        }
        Self { by_dependency }
    }

    /// Direct dependents of `id`.
    pub fn of(&self, id: &str) -> &[&'a Step] {
        self.by_dependency.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Blocked steps that may become pending because `resolved_id` resolved:
/// every one of their dependencies is completed, skipped, or `resolved_id`.
pub fn releasable<'a>(steps: &'a [Step], resolved_id: &str) -> Vec<&'a Step> {
    let statuses: HashMap<&str, StepStatus> = steps
        .iter()
        .map(|step| (step.id.as_str(), step.status))
        .collect();
    let dependents = Dependents::build(steps);

    dependents
        .of(resolved_id)
        .iter()
        .copied()
        .filter(|step| step.status == StepStatus::Blocked)
        .filter(|step| {
            step.depends_on.ids().iter().all(|dep| {
                dep == resolved_id
                    || statuses
                        .get(dep.as_str())
                        .is_some_and(StepStatus::is_resolved)
            })
        })
        .collect()
}

/// Moves every releasable blocked dependent of `resolved_id` back to
/// pending, recording each change in the session.
pub fn propagate(session: &mut Session<'_>, plan_id: &str, resolved_id: &str) -> Result<Vec<Step>> {
    let steps = session.db.list_steps(plan_id)?;
    let ids: Vec<String> = releasable(&steps, resolved_id)
        .into_iter()
        .map(|step| step.id.clone())
        .collect();

    let mut released = Vec::with_capacity(ids.len());
    for id in ids {
        let step = session
            .db
            .transition_step(&id, StepStatus::Blocked, StepStatus::Pending)?;
        debug!("step {id} unblocked by {resolved_id}");
        session.record_updated(step.clone());
        released.push(step);
    }
    Ok(released)
}
