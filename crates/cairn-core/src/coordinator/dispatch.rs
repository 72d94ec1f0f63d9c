//! Hands dispatched steps to the executor and reports outcomes back.

use std::{
    any::Any,
    sync::{Arc, Weak},
};

use log::{debug, warn};
use tokio::{sync::mpsc, task::JoinHandle};

use super::{Coordinator, Inner};
use crate::{
    executor::{ExecutionOutcome, Executor, ExecutorError},
    models::Step,
};

/// Spawns the dispatcher loop. It ends once the coordinator and with it the
/// sending half of the channel are dropped.
pub(crate) fn spawn(
    inner: Weak<Inner>,
    executor: Arc<dyn Executor>,
    mut rx: mpsc::UnboundedReceiver<Step>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(step) = rx.recv().await {
            debug!("dispatching step {} ({})", step.id, step.action);
            tokio::spawn(run_step(inner.clone(), Arc::clone(&executor), step));
        }
        debug!("dispatcher stopped");
    })
}

async fn run_step(inner: Weak<Inner>, executor: Arc<dyn Executor>, step: Step) {
    let step_id = step.id.clone();

    // A separate task so that a panicking executor surfaces as a JoinError
    let outcome = match tokio::spawn(async move { executor.execute(step).await }).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(ExecutorError::new(format!(
            "executor panicked: {}",
            panic_message(e.into_panic().as_ref())
        ))),
        Err(e) => Err(ExecutorError::new(format!("executor task failed: {e}"))),
    };

    let Some(inner) = inner.upgrade() else {
        debug!("coordinator dropped; discarding outcome of step {step_id}");
        return;
    };
    let coordinator = Coordinator { inner };

    let reported = match outcome {
        Ok(ExecutionOutcome::Completed(result)) => coordinator
            .complete_step(&step_id, result)
            .await
            .map(|_| ()),
        Ok(ExecutionOutcome::Deferred) => {
            debug!("step {step_id} continues out of band");
            Ok(())
        }
        Err(e) => coordinator
            .fail_step(&step_id, &e.message)
            .await
            .map(|_| ()),
    };

    if let Err(e) = reported {
        warn!("could not record outcome of step {step_id}: {e}");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
