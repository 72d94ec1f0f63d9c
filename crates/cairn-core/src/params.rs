//! Parameter structures for coordinator operations.
//!
//! These structures are shared by every interface that drives the
//! coordinator (the CLI, JSON payload files, embedding applications). They
//! carry serde derives so that a planner can hand them over as JSON, but no
//! framework-specific attributes.
//!
//! A plan proposal looks like this:
//!
//! ```json
//! {
//!   "workspace": "studio",
//!   "goal": "Produce launch visuals",
//!   "auto_advance": true,
//!   "max_parallel": 2,
//!   "steps": [
//!     { "id": "moodboard", "description": "Collect references", "action": "board.collect" },
//!     { "id": "hero", "description": "Render hero image", "action": "image.render",
//!       "params": { "size": "1024x1024" }, "depends_on": ["moodboard"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoordinatorError, Result};

/// Parameters for creating a plan together with its initial steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePlan {
    /// Caller-supplied plan id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Workspace the plan belongs to
    pub workspace: String,
    /// Goal the steps work towards
    pub goal: String,
    /// Dispatch runnable steps automatically once approved
    #[serde(default)]
    pub auto_advance: bool,
    /// Concurrency bound; the coordinator default applies when absent
    #[serde(default)]
    pub max_parallel: Option<u32>,
    /// Initial steps in execution-index order
    pub steps: Vec<StepDraft>,
}

/// A step proposed by the planner, before it is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDraft {
    /// Caller-supplied step id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable description
    pub description: String,
    /// Operation name handed to the executor
    pub action: String,
    /// Opaque payload handed to the executor
    #[serde(default)]
    pub params: Value,
    /// Ids of sibling steps this step waits for
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// An edit to a step that has not run yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Revision {
    /// Replace the step's params
    UpdateParams { step_id: String, params: Value },
    /// Replace the step's description
    UpdateDescription { step_id: String, description: String },
    /// Skip the step and release its dependents
    Skip { step_id: String },
    /// Insert a new step right after the referenced one
    InsertAfter { step_id: String, step: StepDraft },
}

impl Revision {
    /// The step the revision targets (the reference step for insertions).
    pub fn target_step_id(&self) -> &str {
        match self {
            Revision::UpdateParams { step_id, .. }
            | Revision::UpdateDescription { step_id, .. }
            | Revision::Skip { step_id }
            | Revision::InsertAfter { step_id, .. } => step_id,
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Revision::UpdateParams { .. } => "update_params",
            Revision::UpdateDescription { .. } => "update_description",
            Revision::Skip { .. } => "skip",
            Revision::InsertAfter { .. } => "insert_after",
        }
    }
}

impl StepDraft {
    /// Validates the shape of a single draft.
    pub fn validate(&self) -> Result<()> {
        if self.action.trim().is_empty() {
            return Err(CoordinatorError::invalid_input("action").with_reason("must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(
                CoordinatorError::invalid_input("description").with_reason("must not be empty")
            );
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(CoordinatorError::invalid_input("id").with_reason("must not be blank"));
            }
        }
        Ok(())
    }
}

impl CreatePlan {
    /// Validates the shape of the proposal.
    ///
    /// Dependency references and cycles are checked separately by the engine
    /// once step ids are assigned.
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::InvalidInput` - When a required field is empty or
    ///   `max_parallel` is zero
    pub fn validate(&self) -> Result<()> {
        if self.goal.trim().is_empty() {
            return Err(CoordinatorError::invalid_input("goal").with_reason("must not be empty"));
        }
        if self.workspace.trim().is_empty() {
            return Err(
                CoordinatorError::invalid_input("workspace").with_reason("must not be empty")
            );
        }
        if self.steps.is_empty() {
            return Err(CoordinatorError::invalid_input("steps")
                .with_reason("a plan needs at least one step"));
        }
        if self.max_parallel == Some(0) {
            return Err(CoordinatorError::invalid_input("max_parallel")
                .with_reason("must be at least 1"));
        }
        self.steps.iter().try_for_each(StepDraft::validate)
    }
}
