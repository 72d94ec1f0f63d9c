//! The contract between the engine and whatever actually runs a step.
//!
//! Executors are black boxes to the engine. The coordinator hands a step to
//! the registered executor and never waits for it; the outcome travels back
//! through the dispatcher as a `complete_step` or `fail_step` call.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::Step;

/// What an executor reports for a finished dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The action finished; the value becomes the step result
    Completed(Value),
    /// The action continues out of band and will report back itself through
    /// `Coordinator::complete_step` or `Coordinator::fail_step`
    Deferred,
}

/// Failure reported by an executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs a step's action.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute the step. Errors (and panics) turn into a failed step.
    async fn execute(&self, step: Step) -> Result<ExecutionOutcome, ExecutorError>;
}
