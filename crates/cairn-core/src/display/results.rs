//! Result wrapper types for displaying operation outcomes.
//!
//! Each wrapper prints a one-line confirmation followed by the affected
//! resource in full.

use std::fmt;

use super::collections::Steps;
use crate::{
    coordinator::StepFailure,
    models::{Plan, Step},
};

/// Wrapper type for displaying the result of create operations.
///
/// # Examples
///
/// ```rust
/// use cairn_core::{
///     display::CreateResult,
///     models::{Plan, PlanStatus},
/// };
/// use jiff::Timestamp;
///
/// let plan = Plan {
///     id: "launch".to_string(),
///     workspace: "studio".to_string(),
///     goal: "Produce launch visuals".to_string(),
///     status: PlanStatus::Planning,
///     created_by: "ana".to_string(),
///     auto_advance: false,
///     max_parallel: 3,
///     active_step_count: 0,
///     current_step_index: None,
///     revised: false,
///     created_at: Timestamp::now(),
///     updated_at: Timestamp::now(),
///     steps: vec![],
/// };
///
/// let output = CreateResult::new(plan).to_string();
/// assert!(output.contains("Created plan with ID: launch"));
/// ```
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    /// Create a new CreateResult wrapper.
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for CreateResult<Plan> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created plan with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for CreateResult<Step> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created step with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

/// Wrapper type for displaying the result of update operations, with an
/// optional list of what changed.
pub struct UpdateResult<T> {
    pub resource: T,
    pub changes: Vec<String>,
}

impl<T> UpdateResult<T> {
    /// Create a new UpdateResult wrapper.
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            changes: Vec::new(),
        }
    }

    /// Create an UpdateResult with a list of changes made.
    pub fn with_changes(resource: T, changes: Vec<String>) -> Self {
        Self { resource, changes }
    }

    fn fmt_changes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Changes made:")?;
            for change in &self.changes {
                writeln!(f, "- {change}")?;
            }
        }
        writeln!(f)
    }
}

impl fmt::Display for UpdateResult<Plan> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated plan with ID: {}", self.resource.id)?;
        self.fmt_changes(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for UpdateResult<Step> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated step with ID: {}", self.resource.id)?;
        self.fmt_changes(f)?;
        write!(f, "{}", self.resource)
    }
}

/// Outcome of a manual advance.
pub struct AdvanceResult {
    pub plan: Plan,
    pub step: Option<Step>,
}

impl fmt::Display for AdvanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Some(step) => {
                writeln!(f, "Started step with ID: {}", step.id)?;
                writeln!(f)?;
                write!(f, "{step}")
            }
            None => writeln!(
                f,
                "No step started; plan {} is {} with {}/{} active steps",
                self.plan.id,
                self.plan.status,
                self.plan.active_step_count,
                self.plan.max_parallel
            ),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Marked step {} as failed", self.step.id)?;
        writeln!(f)?;
        write!(f, "{}", self.step)?;
        if !self.blocked.is_empty() {
            writeln!(f, "## Blocked steps")?;
            writeln!(f)?;
            write!(f, "{}", Steps(self.blocked.clone()))?;
        }
        Ok(())
    }
}
