//! Step operations for the Coordinator.
//!
//! `complete_step` and `fail_step` are the executor's way back into the
//! engine. Both tolerate arriving after the plan was cancelled: the call is
//! then a no-op and returns `None`.

use serde_json::Value;

use super::{Coordinator, StepFailure};
use crate::{display::AdvanceResult, engine::machine, error::Result, models::Step};

impl Coordinator {
    /// Records the result of an in-progress step, releases dependents that
    /// were waiting on it, and settles the plan.
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::StepNotFound` - No step has this id
    /// * `CoordinatorError::InvalidTransition` - The step is not in progress
    pub async fn complete_step(&self, step_id: &str, result: Value) -> Result<Option<Step>> {
        let plan_id = self.plan_of_step(step_id).await?;
        let id = step_id.to_string();
        let (step, _) = self
            .transact(&plan_id, move |s| machine::complete_step(s, &id, &result))
            .await?;
        Ok(step)
    }

    /// Records the failure of an in-progress step, blocks its pending direct
    /// dependents and pauses the plan.
    pub async fn fail_step(&self, step_id: &str, error: &str) -> Result<Option<StepFailure>> {
        let plan_id = self.plan_of_step(step_id).await?;
        let (id, error) = (step_id.to_string(), error.to_string());
        let (failure, transition) = self
            .transact(&plan_id, move |s| machine::fail_step(s, &id, &error))
            .await?;
        Ok(failure.map(|(step, blocked)| StepFailure {
            plan: transition.plan,
            step,
            blocked,
        }))
    }

    /// Skips a pending or blocked step and releases its dependents.
    pub async fn skip_step(&self, step_id: &str) -> Result<Step> {
        let plan_id = self.plan_of_step(step_id).await?;
        let id = step_id.to_string();
        let (step, _) = self
            .transact(&plan_id, move |s| machine::skip_step(s, &id))
            .await?;
        Ok(step)
    }

    /// Puts a failed step back to pending and attempts one advance.
    ///
    /// Dependents blocked by the failure are released only once the step
    /// completes.
    pub async fn retry_step(&self, step_id: &str) -> Result<AdvanceResult> {
        let plan_id = self.plan_of_step(step_id).await?;
        let id = step_id.to_string();
        let (step, transition) = self
            .transact(&plan_id, move |s| machine::retry_step(s, &id))
            .await?;
        Ok(AdvanceResult {
            plan: transition.plan,
            step,
        })
    }
}
