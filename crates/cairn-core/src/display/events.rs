//! One-line rendering of change notifications, for live logs.

use std::fmt;

use crate::events::PlanEvent;

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanEvent::PlanCreated { plan, steps } => writeln!(
                f,
                "**{}** `{}` {} with {} steps",
                self.name(),
                plan.id,
                plan.status,
                steps.len()
            ),
            PlanEvent::PlanUpdated { plan } => writeln!(
                f,
                "**{}** `{}` {} ({}/{} active)",
                self.name(),
                plan.id,
                plan.status,
                plan.active_step_count,
                plan.max_parallel
            ),
            PlanEvent::StepCreated { step } | PlanEvent::StepUpdated { step } => {
                write!(
                    f,
                    "**{}** `{}` {}",
                    self.name(),
                    step.id,
                    step.status.with_icon()
                )?;
                if let Some(error) = &step.error_message {
                    write!(f, ": {error}")?;
                }
                writeln!(f)
            }
        }
    }
}
