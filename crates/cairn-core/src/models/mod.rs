//! Data models for plans and steps.
//!
//! This module contains the core domain models of the engine. Display
//! implementations live in [`crate::display::models`] so that presentation
//! stays separate from the data structures.
//!
//! # Examples
//!
//! ```rust
//! use cairn_core::models::{Dependencies, Step, StepStatus};
//! use jiff::Timestamp;
//!
//! let step = Step {
//!     id: "fetch".to_string(),
//!     plan_id: "plan-1".to_string(),
//!     step_index: 0,
//!     position: 0,
//!     description: "Fetch the brand assets".to_string(),
//!     action: "assets.fetch".to_string(),
//!     params: serde_json::json!({ "folder": "brand" }),
//!     depends_on: Dependencies::default(),
//!     status: StepStatus::Pending,
//! #   result: None,
//! #   error_message: None,
//! #   created_at: Timestamp::now(),
//! #   updated_at: Timestamp::now(),
//! };
//! assert!(step.to_string().starts_with("### 1. Fetch the brand assets (○ Pending)"));
//! ```

pub mod actor;
pub mod dependencies;
pub mod plan;
pub mod status;
pub mod step;


pub use actor::{Actor, Role};
pub use dependencies::Dependencies;
pub use plan::{Plan, DEFAULT_MAX_PARALLEL};
pub use status::{PlanStatus, StepStatus};
pub use step::Step;
