//! Synchronous plan/step state machine.
//!
//! Everything in this module runs on a blocking thread against one
//! [`Database`] connection, inside one transaction, while the coordinator
//! holds the plan's lock. Operations record what they mutate in a
//! [`Session`]; the coordinator turns the finished [`Transition`] into
//! notifications and executor dispatches once the transaction committed.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │   machine    │───▶│  scheduler   │───▶│   resolver   │
//! │  revision    │───▶│   unblock    │    │    graph     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!   state rules        slot filling,        pure queries
//!                      propagation
//! ```

pub mod graph;
pub mod machine;
pub mod resolver;
pub mod revision;
pub mod scheduler;
pub mod unblock;

use crate::{
    db::Database,
    error::Result,
    models::{Plan, PlanStatus, Step},
};

/// A step mutation, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum StepChange {
    Created(Step),
    Updated(Step),
}

impl StepChange {
    pub fn step(&self) -> &Step {
        match self {
            StepChange::Created(step) | StepChange::Updated(step) => step,
        }
    }
}

/// Result of one engine operation.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Plan state after the operation
    pub plan: Plan,
    /// Step mutations in order
    pub changes: Vec<StepChange>,
    /// Steps to hand to the executor, in dispatch order
    pub dispatches: Vec<Step>,
    /// Whether the plan record itself changed
    pub plan_changed: bool,
}

impl Transition {
    /// Whether the operation mutated anything and should be broadcast.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && !self.plan_changed
    }
}

/// Mutation log of one engine operation.
pub struct Session<'a> {
    pub(crate) db: &'a Database,
    dispatch_enabled: bool,
    changes: Vec<StepChange>,
    dispatches: Vec<Step>,
    plan_changed: bool,
}

impl<'a> Session<'a> {
    /// `dispatch_enabled` reflects whether an executor is registered.
    pub fn new(db: &'a Database, dispatch_enabled: bool) -> Self {
        Self {
            db,
            dispatch_enabled,
            changes: Vec::new(),
            dispatches: Vec::new(),
            plan_changed: false,
        }
    }

    pub fn dispatch_enabled(&self) -> bool {
        self.dispatch_enabled
    }

    pub(crate) fn record_updated(&mut self, step: Step) {
        self.changes.push(StepChange::Updated(step));
    }

    pub(crate) fn record_created(&mut self, step: Step) {
        self.changes.push(StepChange::Created(step));
    }

    /// Queues a step for the executor; ignored when none is registered.
    pub(crate) fn dispatch(&mut self, step: Step) {
        if self.dispatch_enabled {
            self.dispatches.push(step);
        }
    }

    pub(crate) fn set_plan_status(&mut self, plan_id: &str, status: PlanStatus) -> Result<()> {
        self.db.set_plan_status(plan_id, status)?;
        self.plan_changed = true;
        Ok(())
    }

    pub(crate) fn set_status_and_index(
        &mut self,
        plan_id: &str,
        status: PlanStatus,
        index: u32,
    ) -> Result<()> {
        self.db.set_status_and_index(plan_id, status, index)?;
        self.plan_changed = true;
        Ok(())
    }

    pub(crate) fn set_auto_advance(&mut self, plan_id: &str, enabled: bool) -> Result<()> {
        self.db.set_auto_advance(plan_id, enabled)?;
        self.plan_changed = true;
        Ok(())
    }

    pub(crate) fn mark_revised(&mut self, plan_id: &str) -> Result<()> {
        self.db.mark_revised(plan_id)?;
        self.plan_changed = true;
        Ok(())
    }

    /// Reloads the plan and closes the session.
    pub fn finish(self, plan_id: &str) -> Result<Transition> {
        if !self.changes.is_empty() && !self.plan_changed {
            self.db.touch_plan(plan_id)?;
        }
        let plan = self.db.require_plan(plan_id)?;
        Ok(Transition {
            plan,
            changes: self.changes,
            dispatches: self.dispatches,
            plan_changed: self.plan_changed,
        })
    }
}
