//! Markdown rendering of plans, steps, events and operation results.
//!
//! Domain models implement `Display` directly; operation outcomes are wrapped
//! in small result types so that each command prints a confirmation line
//! followed by the affected record.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │  Result Types   │    │    Markdown     │
//! │  (Plan, Step,   │───▶│  & Collections  │───▶│     Output      │
//! │   PlanEvent)    │    │                 │    │   (terminal)    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ```rust
//! use cairn_core::display::OperationStatus;
//!
//! let status = OperationStatus::success("Plan launch approved");
//! assert_eq!(status.to_string(), "Success: Plan launch approved\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod events;
pub mod models;
pub mod results;
pub mod status;

pub use collections::Steps;
pub use datetime::LocalDateTime;
pub use results::{AdvanceResult, CreateResult, UpdateResult};
pub use status::OperationStatus;
