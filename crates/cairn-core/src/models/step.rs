//! Step model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Dependencies, StepStatus};

/// Represents one unit of work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Unique identifier for the step
    pub id: String,

    /// ID of the parent plan
    pub plan_id: String,

    /// Creation order within the plan; never renumbered
    pub step_index: u32,

    /// Display order within the plan (0-indexed); shifts on insertion
    pub position: u32,

    /// Human-readable description of the step
    pub description: String,

    /// Opaque operation name interpreted by the executor
    pub action: String,

    /// Opaque payload handed to the executor
    #[serde(default)]
    pub params: Value,

    /// Sibling steps that must be completed or skipped first
    #[serde(default)]
    pub depends_on: Dependencies,

    /// Current status of the step
    pub status: StepStatus,

    /// Output reported when the step completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error reported when the step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Timestamp when the step was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the step was last updated (UTC)
    pub updated_at: Timestamp,
}
