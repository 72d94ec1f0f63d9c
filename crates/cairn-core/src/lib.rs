//! Core library of Cairn, an execution engine for AI-proposed plans.
//!
//! A planner proposes a [`Plan`]: a goal plus a set of steps that may depend
//! on one another. Humans approve, reject, revise or cancel it; an
//! [`Executor`] carries out the steps. This crate owns the rules in between:
//!
//! - which steps may run now (dependency resolution)
//! - how many may run at once (a per-plan concurrency bound filled by the
//!   auto-advance scheduler)
//! - what a failure does to the steps behind it, and how a skip or a retry
//!   releases them
//! - which edits are allowed once execution started
//!
//! Every operation goes through the [`Coordinator`], which serializes work
//! per plan, persists it in SQLite, and publishes [`PlanEvent`]s in the
//! order changes were applied.
//!
//! # Quick Start
//!
//! ```rust
//! use cairn_core::{
//!     models::{Actor, PlanStatus, Role},
//!     params::{CreatePlan, StepDraft},
//!     CoordinatorBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let coordinator = CoordinatorBuilder::new()
//!     .with_database_path(Some(dir.path().join("cairn.db")))
//!     .build()
//!     .await?;
//! let ana = Actor::new("ana", Role::Owner);
//!
//! let plan = coordinator
//!     .create_plan(
//!         &CreatePlan {
//!             workspace: "studio".to_string(),
//!             goal: "Produce launch visuals".to_string(),
//!             steps: vec![StepDraft {
//!                 id: Some("moodboard".to_string()),
//!                 description: "Collect references".to_string(),
//!                 action: "board.collect".to_string(),
//!                 ..Default::default()
//!             }],
//!             ..Default::default()
//!         },
//!         &ana,
//!     )
//!     .await?;
//!
//! coordinator.approve(&plan.id, &ana).await?;
//! coordinator.advance(&plan.id, &ana).await?;
//! coordinator
//!     .complete_step("moodboard", serde_json::json!({"images": 12}))
//!     .await?;
//!
//! let plan = coordinator.get_plan(&plan.id).await?;
//! assert_eq!(plan.status, PlanStatus::Completed);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod db;
pub mod display;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod models;
pub mod params;

// Re-export commonly used types
pub use coordinator::{Coordinator, CoordinatorBuilder, StepFailure};
pub use db::Database;
pub use display::{AdvanceResult, CreateResult, LocalDateTime, OperationStatus, Steps, UpdateResult};
pub use error::{CoordinatorError, ErrorKind, Result};
pub use events::{BroadcastSink, ChannelSink, NoopSink, PlanEvent};
pub use executor::{ExecutionOutcome, Executor, ExecutorError};
pub use models::{Actor, Dependencies, Plan, PlanStatus, Role, Step, StepStatus};
pub use params::{CreatePlan, Revision, StepDraft};
