//! Plan model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{PlanStatus, Step, StepStatus};

/// Default concurrency bound for a plan.
pub const DEFAULT_MAX_PARALLEL: u32 = 3;

/// Represents a goal-directed plan with its steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: String,

    /// Shared workspace the plan belongs to
    pub workspace: String,

    /// Goal the planner proposed the steps for
    pub goal: String,

    /// Lifecycle status of the plan
    #[serde(default)]
    pub status: PlanStatus,

    /// Actor that created the plan
    pub created_by: String,

    /// Dispatch runnable steps without per-step user action
    pub auto_advance: bool,

    /// Upper bound on concurrently in-progress steps
    pub max_parallel: u32,

    /// Number of steps currently in progress, counted when the plan is read
    pub active_step_count: u32,

    /// Step index of the most recently advanced step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<u32>,

    /// Whether any step was revised after creation
    pub revised: bool,

    /// Timestamp when the plan was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the plan was last modified (UTC)
    pub updated_at: Timestamp,

    /// Associated steps in display order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    /// Free concurrency slots.
    pub fn available_slots(&self) -> u32 {
        self.max_parallel.saturating_sub(self.active_step_count)
    }

    /// Looks up one of this plan's steps.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Number of steps with the given status.
    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|step| step.status == status).count()
    }
}
