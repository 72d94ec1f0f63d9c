//! The plan coordinator: the public face of the execution engine.
//!
//! [`Coordinator`] owns the state-machine rules and exposes every plan and
//! step operation. Each operation runs the same way:
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   plan lock     │    │ engine, in one  │    │ events to sink, │
//! │   (PlanLocks)   │───▶│ SQLite tx on a  │───▶│ steps to the    │
//! │                 │    │ blocking thread │    │ dispatcher      │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! The lock is held until the events of the operation were published, so
//! notifications for one plan come out in the order operations applied.
//!
//! ## Submodules
//!
//! - [`builder`]: configuration and construction
//! - [`plan_ops`]: plan lifecycle, advance, auto-advance, revisions, queries
//! - [`step_ops`]: executor callbacks and human recovery (skip, retry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use cairn_core::{
//!     models::{Actor, Role},
//!     params::{CreatePlan, StepDraft},
//!     CoordinatorBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = CoordinatorBuilder::new()
//!     .with_database_path(Some("cairn.db"))
//!     .build()
//!     .await?;
//! let actor = Actor::new("ana", Role::Owner);
//!
//! let plan = coordinator
//!     .create_plan(
//!         &CreatePlan {
//!             workspace: "studio".to_string(),
//!             goal: "Produce launch visuals".to_string(),
//!             steps: vec![StepDraft {
//!                 description: "Collect references".to_string(),
//!                 action: "board.collect".to_string(),
//!                 ..Default::default()
//!             }],
//!             ..Default::default()
//!         },
//!         &actor,
//!     )
//!     .await?;
//!
//! coordinator.approve(&plan.id, &actor).await?;
//! let advanced = coordinator.advance(&plan.id, &actor).await?;
//! if let Some(step) = advanced.step {
//!     coordinator.complete_step(&step.id, serde_json::json!({"ok": true})).await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::{path::PathBuf, sync::Arc};

use log::warn;
use tokio::{sync::mpsc, task};

use crate::{
    db::Database,
    engine::{Session, StepChange, Transition},
    error::{CoordinatorError, Result},
    events::{BroadcastSink, PlanEvent},
    models::{Plan, Step},
};

pub mod builder;
mod dispatch;
mod locks;
pub mod plan_ops;
pub mod step_ops;


pub use builder::CoordinatorBuilder;
use locks::PlanLocks;

/// A failed step, the dependents it blocked, and the plan afterwards.
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub plan: Plan,
    pub step: Step,
    pub blocked: Vec<Step>,
}

/// Handle to the execution engine. Cheap to clone.
#[derive(Clone)]
pub struct Coordinator {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    db_path: PathBuf,
    locks: PlanLocks,
    sink: Arc<dyn BroadcastSink>,
    dispatcher: Option<mpsc::UnboundedSender<Step>>,
    default_max_parallel: u32,
}

impl Coordinator {
    /// Whether an executor is registered.
    pub fn has_executor(&self) -> bool {
        self.inner.dispatcher.is_some()
    }

    /// Runs `f` against a fresh connection on a blocking thread.
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.inner.db_path.clone();
        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            f(&db)
        })
        .await
        .map_err(|e| CoordinatorError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Runs one engine operation under the plan's lock, in one transaction,
    /// then publishes its events and hands its dispatches over.
    async fn transact<T, F>(&self, plan_id: &str, op: F) -> Result<(T, Transition)>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.inner.locks.lock(plan_id).await;
        let dispatch_enabled = self.has_executor();
        let plan_id = plan_id.to_string();

        let (value, transition) = self
            .with_db(move |db| {
                db.atomically(|db| {
                    let mut session = Session::new(db, dispatch_enabled);
                    let value = op(&mut session)?;
                    Ok((value, session.finish(&plan_id)?))
                })
            })
            .await?;

        self.publish(&transition);
        self.dispatch(&transition);
        Ok((value, transition))
    }

    /// Step events in mutation order, then one plan event.
    fn publish(&self, transition: &Transition) {
        if transition.is_noop() {
            return;
        }
        for change in &transition.changes {
            let event = match change {
                StepChange::Created(step) => PlanEvent::StepCreated { step: step.clone() },
                StepChange::Updated(step) => PlanEvent::StepUpdated { step: step.clone() },
            };
            self.inner.sink.publish(&event);
        }
        self.inner.sink.publish(&PlanEvent::PlanUpdated {
            plan: transition.plan.clone(),
        });
    }

    fn dispatch(&self, transition: &Transition) {
        let Some(tx) = &self.inner.dispatcher else {
            return;
        };
        for step in &transition.dispatches {
            if tx.send(step.clone()).is_err() {
                warn!("dispatcher is gone; step {} stays in progress", step.id);
            }
        }
    }

    /// Looks up the plan a step belongs to. Step ownership never changes, so
    /// this is safe to do before taking the plan lock.
    async fn plan_of_step(&self, step_id: &str) -> Result<String> {
        let step_id = step_id.to_string();
        self.with_db(move |db| db.require_step(&step_id).map(|step| step.plan_id))
            .await
    }
}
