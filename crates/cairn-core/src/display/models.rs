//! Display implementations for domain models.
//!
//! Kept apart from the model definitions so that the models stay plain data.
//! All output is markdown: headers, metadata bullets, then sections.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::models::{Plan, PlanStatus, Step, StepStatus};

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.goal)?;
        writeln!(f)?;

        writeln!(f, "- ID: `{}`", self.id)?;
        writeln!(f, "- Workspace: {}", self.workspace)?;
        writeln!(f, "- Status: {}", self.status)?;
        writeln!(f, "- Created by: {}", self.created_by)?;
        writeln!(
            f,
            "- Auto-advance: {}",
            if self.auto_advance { "on" } else { "off" }
        )?;
        writeln!(
            f,
            "- Active steps: {}/{}",
            self.active_step_count, self.max_parallel
        )?;
        if let Some(index) = self.current_step_index {
            writeln!(f, "- Current step index: {index}")?;
        }
        if self.revised {
            writeln!(f, "- Revised after creation")?;
        }
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if self.steps.is_empty() {
            writeln!(f, "\nNo steps in this plan.")?;
        } else {
            let done = self.count_steps(StepStatus::Completed) + self.count_steps(StepStatus::Skipped);
            writeln!(f, "\n## Steps ({done}/{})", self.steps.len())?;
            writeln!(f)?;
            for step in &self.steps {
                write!(f, "{step}")?;
            }
        }

        Ok(())
    }
}

impl Step {
    /// Compact markdown block, the same standalone or inside a plan.
    fn fmt_step(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {}. {} ({})",
            self.position + 1,
            self.description,
            self.status.with_icon()
        )?;
        writeln!(f)?;
        writeln!(f, "- ID: `{}`", self.id)?;
        writeln!(f, "- Action: `{}`", self.action)?;

        let deps = self.depends_on.ids();
        if self.depends_on.is_malformed() {
            writeln!(f, "- Depends on: (unreadable)")?;
        } else if !deps.is_empty() {
            let list: Vec<String> = deps.iter().map(|d| format!("`{d}`")).collect();
            writeln!(f, "- Depends on: {}", list.join(", "))?;
        }
        writeln!(f)?;

        if !self.params.is_null() {
            writeln!(f, "#### Params")?;
            writeln!(f)?;
            writeln!(f, "```json\n{}\n```", self.params)?;
            writeln!(f)?;
        }

        if self.status == StepStatus::Completed {
            if let Some(result) = &self.result {
                writeln!(f, "#### Result")?;
                writeln!(f)?;
                writeln!(f, "```json\n{result}\n```")?;
                writeln!(f)?;
            }
        }

        if let Some(error) = &self.error_message {
            writeln!(f, "#### Error")?;
            writeln!(f)?;
            writeln!(f, "{error}")?;
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_step(f)
    }
}
