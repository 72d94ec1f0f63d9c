//! `plan run`: drive a plan to rest with a local program as executor.

use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use cairn_core::{ChannelSink, OperationStatus, Plan, PlanEvent, PlanStatus, StepStatus};
use log::{debug, info, warn};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::{
    cli::{Cli, RunPlanArgs},
    exec::CommandExecutor,
};

/// How often the store is re-read for changes made outside this process.
const RESYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Steps this run started and has not seen resolved.
///
/// Only this process's coordinator publishes into the run's sink, and it only
/// moves a step to in progress when it dispatches it to the local executor.
/// Steps another process (or an earlier `plan advance`) started are never
/// tracked, so they cannot keep the run waiting.
#[derive(Debug, Default)]
struct InFlight {
    steps: HashSet<String>,
    /// Tracked steps the store already showed as resolved at the last resync.
    resolved_elsewhere: HashSet<String>,
    /// Step events seen since the last plan event; a transition ends with one.
    mid_transition: bool,
}

impl InFlight {
    fn observe(&mut self, event: &PlanEvent) {
        match event {
            PlanEvent::StepCreated { step } | PlanEvent::StepUpdated { step } => {
                self.mid_transition = true;
                if step.status == StepStatus::InProgress {
                    self.steps.insert(step.id.clone());
                } else {
                    self.steps.remove(&step.id);
                    self.resolved_elsewhere.remove(&step.id);
                }
            }
            PlanEvent::PlanCreated { .. } | PlanEvent::PlanUpdated { .. } => {
                self.mid_transition = false;
            }
        }
    }

    /// Forgets tracked steps the store has shown resolved on two resyncs in a
    /// row. Their outcome was recorded by someone else, so the local result
    /// will be refused and no event will follow.
    fn resync(&mut self, plan: &Plan) {
        let resolved: HashSet<String> = self
            .steps
            .iter()
            .filter(|id| {
                plan.step(id)
                    .map_or(true, |step| step.status != StepStatus::InProgress)
            })
            .cloned()
            .collect();
        for id in resolved.intersection(&self.resolved_elsewhere) {
            debug!("step {id} was resolved outside this run");
            self.steps.remove(id);
        }
        self.resolved_elsewhere = resolved
            .into_iter()
            .filter(|id| self.steps.contains(id))
            .collect();
    }

    /// After lost events only the store is left to go by.
    fn reset(&mut self, plan: &Plan) {
        self.steps.retain(|id| {
            plan.step(id)
                .is_some_and(|step| step.status == StepStatus::InProgress)
        });
        self.resolved_elsewhere.clear();
        self.mid_transition = false;
    }

    fn is_idle(&self) -> bool {
        self.steps.is_empty() && !self.mid_transition
    }
}

impl Cli {
    pub(crate) async fn run_plan(&self, args: RunPlanArgs) -> Result<()> {
        let RunPlanArgs { id, command, args } = args;

        let sink = ChannelSink::default();
        let mut events = sink.subscribe();
        let coordinator = self
            .builder
            .clone()
            .with_executor(Arc::new(CommandExecutor::new(command, args)))
            .with_sink(Arc::new(sink))
            .build()
            .await
            .context("Failed to initialize coordinator")?;

        let plan = coordinator
            .get_plan(&id)
            .await
            .with_context(|| format!("Failed to load plan {id}"))?;
        if plan.status == PlanStatus::Planning {
            coordinator
                .approve(&id, &self.actor)
                .await
                .context("Failed to approve plan")?;
        }
        let plan = coordinator
            .set_auto_advance(&id, &self.actor, true)
            .await
            .context("Failed to turn on auto-advance")?;
        info!("running plan {id}");

        let mut in_flight = InFlight::default();
        let mut ended = plan.status.is_terminal();
        let mut ticks = tokio::time::interval(RESYNC_INTERVAL);
        'run: loop {
            // Events already buffered decide whether anything is left to wait for.
            loop {
                match events.try_recv() {
                    Ok(event) => ended |= self.track(&id, &event, &mut in_flight)?,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Lagged(missed)) => {
                        warn!("missed {missed} events for plan {id}");
                        let plan = coordinator.get_plan(&id).await?;
                        ended |= plan.status.is_terminal();
                        in_flight.reset(&plan);
                    }
                    Err(TryRecvError::Closed) => break 'run,
                }
            }
            if ended || in_flight.is_idle() {
                break;
            }

            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => ended |= self.track(&id, &event, &mut in_flight)?,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("missed {missed} events for plan {id}");
                        let plan = coordinator.get_plan(&id).await?;
                        ended |= plan.status.is_terminal();
                        in_flight.reset(&plan);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticks.tick() => {
                    let plan = coordinator.get_plan(&id).await?;
                    ended |= plan.status.is_terminal();
                    in_flight.resync(&plan);
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted; steps still in progress stay in progress");
                    break;
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            if event.plan_id() == id {
                self.renderer.show(&event)?;
            }
        }

        let plan = coordinator.get_plan(&id).await?;
        self.renderer.render("\n")?;
        self.renderer.show(&plan)?;
        let elsewhere: Vec<String> = plan
            .steps
            .iter()
            .filter(|step| step.status == StepStatus::InProgress)
            .map(|step| format!("`{}`", step.id))
            .collect();
        if !elsewhere.is_empty() && !plan.status.is_terminal() {
            self.renderer.show(&OperationStatus::failure(format!(
                "Not started by this run, still in progress: {}",
                elsewhere.join(", ")
            )))?;
        }
        if plan.status != PlanStatus::Completed {
            bail!("plan {id} stopped while {}", plan.status);
        }
        Ok(())
    }

    /// Shows an event for the running plan and folds it into `in_flight`.
    /// Returns whether the plan ended.
    fn track(&self, id: &str, event: &PlanEvent, in_flight: &mut InFlight) -> Result<bool> {
        if event.plan_id() != id {
            return Ok(false);
        }
        self.renderer.show(event)?;
        in_flight.observe(event);
        Ok(matches!(event, PlanEvent::PlanUpdated { plan } if plan.status.is_terminal()))
    }
}

#[cfg(test)]
mod tests {
    use cairn_core::Step;
    use serde_json::json;

    use super::*;

    fn step(id: &str, status: &str) -> Step {
        serde_json::from_value(json!({
            "id": id,
            "plan_id": "launch",
            "step_index": 0,
            "position": 0,
            "description": id,
            "action": "noop",
            "params": {},
            "status": status,
            "created_at": "2026-10-01T09:00:00Z",
            "updated_at": "2026-10-01T09:00:00Z"
        }))
        .unwrap()
    }

    fn plan(status: &str, steps: Vec<Step>) -> Plan {
        serde_json::from_value(json!({
            "id": "launch",
            "workspace": "studio",
            "goal": "Launch",
            "status": status,
            "created_by": "ana",
            "auto_advance": true,
            "max_parallel": 2,
            "active_step_count": 0,
            "revised": false,
            "created_at": "2026-10-01T09:00:00Z",
            "updated_at": "2026-10-01T09:00:00Z",
            "steps": steps
        }))
        .unwrap()
    }

    fn updated(id: &str, status: &str) -> PlanEvent {
        PlanEvent::StepUpdated {
            step: step(id, status),
        }
    }

    fn plan_updated() -> PlanEvent {
        PlanEvent::PlanUpdated {
            plan: plan("executing", vec![]),
        }
    }

    #[test]
    fn test_in_flight_waits_for_own_steps() {
        let mut in_flight = InFlight::default();
        assert!(in_flight.is_idle());

        in_flight.observe(&updated("hero", "in_progress"));
        in_flight.observe(&plan_updated());
        assert!(!in_flight.is_idle());

        // completion and the next dispatch arrive as one transition
        in_flight.observe(&updated("hero", "completed"));
        assert!(!in_flight.is_idle());
        in_flight.observe(&updated("page", "in_progress"));
        in_flight.observe(&plan_updated());
        assert!(!in_flight.is_idle());

        in_flight.observe(&updated("page", "completed"));
        in_flight.observe(&plan_updated());
        assert!(in_flight.is_idle());
    }

    #[test]
    fn test_in_flight_ignores_steps_started_elsewhere() {
        let mut in_flight = InFlight::default();
        in_flight.observe(&updated("hero", "in_progress"));
        in_flight.observe(&plan_updated());
        in_flight.observe(&updated("hero", "completed"));
        in_flight.observe(&plan_updated());

        // copy is in progress in the store, but never went through this run
        let stored = plan(
            "paused",
            vec![step("copy", "in_progress"), step("hero", "completed")],
        );
        in_flight.resync(&stored);
        assert!(in_flight.is_idle());
    }

    #[test]
    fn test_in_flight_forgets_steps_resolved_elsewhere() {
        let mut in_flight = InFlight::default();
        in_flight.observe(&updated("hero", "in_progress"));
        in_flight.observe(&plan_updated());

        let stored = plan("executing", vec![step("hero", "completed")]);
        in_flight.resync(&stored);
        assert!(!in_flight.is_idle());
        in_flight.resync(&stored);
        assert!(in_flight.is_idle());
    }

    #[test]
    fn test_in_flight_reset_after_lost_events() {
        let mut in_flight = InFlight::default();
        in_flight.observe(&updated("copy", "in_progress"));
        in_flight.observe(&updated("hero", "in_progress"));

        in_flight.reset(&plan(
            "executing",
            vec![step("copy", "completed"), step("hero", "in_progress")],
        ));
        assert!(!in_flight.is_idle());
        assert_eq!(in_flight.steps, HashSet::from(["hero".to_string()]));
    }
}
