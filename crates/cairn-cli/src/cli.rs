//! Command definitions and their handlers.
//!
//! Argument structs carry only what clap needs; documents (plans and
//! revisions) come in as JSON and are converted to core parameters in
//! [`crate::input`]. Every handler renders one of the display types from
//! `cairn_core::display`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cairn_core::{
    display::{AdvanceResult, CreateResult, OperationStatus, UpdateResult},
    Actor, Coordinator, CoordinatorBuilder, Revision,
};
use clap::{Args, Subcommand, ValueEnum};
use log::debug;

use crate::{
    input::{self, PlanFile, RevisionFile},
    renderer::TerminalRenderer,
};

/// Create a plan from a JSON proposal
///
/// The file holds `goal`, `steps` and optionally `id`, `workspace`,
/// `auto_advance` and `max_parallel`. Each step has `description`, `action`
/// and optionally `id`, `params` and `depends_on`.
#[derive(Args)]
pub struct CreatePlanArgs {
    /// JSON file with the proposal, or `-` to read stdin
    #[arg(short, long)]
    pub file: PathBuf,
    /// Turn auto-advance on regardless of the proposal
    #[arg(long)]
    pub auto_advance: bool,
    /// Maximum number of steps in progress at once
    #[arg(long)]
    pub max_parallel: Option<u32>,
}

#[derive(Args)]
pub struct PlanIdArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub id: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Turn auto-advance on or off
///
/// Turning it on starts runnable steps right away when an executor is
/// attached, as `plan run` does.
#[derive(Args)]
pub struct AutoAdvanceArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub id: String,
    pub state: Toggle,
}

/// Apply revisions to steps that have not run yet
///
/// The file holds one revision object or an array applied in order. Each
/// object has an `action` (`update_params`, `update_description`, `skip` or
/// `insert_after`) and the `step_id` it targets.
#[derive(Args)]
pub struct RevisePlanArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub id: String,
    /// JSON file with the revisions, or `-` to read stdin
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Execute a plan with a local program as the executor
///
/// The program runs once per step with the step as JSON on stdin. Exit
/// status 0 completes the step with stdout as its result; any other status
/// fails it with stderr as the error. Arguments for the program go after
/// `--`. The plan is approved if needed and auto-advance is turned on; the
/// command returns once nothing is left running.
#[derive(Args)]
pub struct RunPlanArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub id: String,
    /// Program run for every step
    #[arg(long)]
    pub command: String,
    /// Arguments passed to the program
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a plan from a JSON proposal
    #[command(alias = "c")]
    Create(CreatePlanArgs),
    /// Show a plan and its steps
    #[command(alias = "s")]
    Show(PlanIdArgs),
    /// Show the active plan of the workspace
    Active,
    /// Approve a plan that is being planned
    Approve(PlanIdArgs),
    /// Reject a plan that is being planned
    Reject(PlanIdArgs),
    /// Cancel a plan that has not completed
    Cancel(PlanIdArgs),
    /// Start the next runnable step
    #[command(alias = "a")]
    Advance(PlanIdArgs),
    /// Turn auto-advance on or off
    AutoAdvance(AutoAdvanceArgs),
    /// Apply revisions from a JSON file
    #[command(alias = "r")]
    Revise(RevisePlanArgs),
    /// Execute a plan with a local program
    Run(RunPlanArgs),
}

#[derive(Args)]
pub struct StepIdArgs {
    #[arg(help = "Unique identifier of the step")]
    pub id: String,
}

/// Report a step as completed
#[derive(Args)]
pub struct CompleteStepArgs {
    #[arg(help = "Unique identifier of the step")]
    pub id: String,
    /// Result of the step; parsed as JSON when possible
    #[arg(short, long)]
    pub result: Option<String>,
}

/// Report a step as failed
#[derive(Args)]
pub struct FailStepArgs {
    #[arg(help = "Unique identifier of the step")]
    pub id: String,
    /// What went wrong
    #[arg(short, long)]
    pub error: String,
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Report a step as completed
    #[command(alias = "c")]
    Complete(CompleteStepArgs),
    /// Report a step as failed
    #[command(alias = "f")]
    Fail(FailStepArgs),
    /// Skip a pending or blocked step
    Skip(StepIdArgs),
    /// Put a failed step back to pending
    Retry(StepIdArgs),
}

pub struct Cli {
    pub(crate) builder: CoordinatorBuilder,
    pub(crate) renderer: TerminalRenderer,
    pub(crate) actor: Actor,
    pub(crate) workspace: String,
}

impl Cli {
    pub fn new(
        builder: CoordinatorBuilder,
        renderer: TerminalRenderer,
        actor: Actor,
        workspace: String,
    ) -> Self {
        Self {
            builder,
            renderer,
            actor,
            workspace,
        }
    }

    /// Coordinator without an executor: steps are advanced and reported by
    /// hand.
    async fn connect(&self) -> Result<Coordinator> {
        self.builder
            .clone()
            .build()
            .await
            .context("Failed to initialize coordinator")
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Create(args) => self.create_plan(args).await,
            PlanCommands::Show(args) => self.show_plan(&args.id).await,
            PlanCommands::Active => self.show_active_plan().await,
            PlanCommands::Approve(args) => self.approve_plan(&args.id).await,
            PlanCommands::Reject(args) => self.reject_plan(&args.id).await,
            PlanCommands::Cancel(args) => self.cancel_plan(&args.id).await,
            PlanCommands::Advance(args) => self.advance_plan(&args.id).await,
            PlanCommands::AutoAdvance(args) => self.set_auto_advance(args).await,
            PlanCommands::Revise(args) => self.revise_plan(args).await,
            PlanCommands::Run(args) => self.run_plan(args).await,
        }
    }

    pub async fn handle_step_command(&self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Complete(args) => self.complete_step(args).await,
            StepCommands::Fail(args) => self.fail_step(args).await,
            StepCommands::Skip(args) => self.skip_step(&args.id).await,
            StepCommands::Retry(args) => self.retry_step(&args.id).await,
        }
    }

    async fn create_plan(&self, args: CreatePlanArgs) -> Result<()> {
        let file: PlanFile = input::read_json(&args.file)?;
        let mut params = file.into_params(&self.workspace);
        if args.auto_advance {
            params.auto_advance = true;
        }
        if args.max_parallel.is_some() {
            params.max_parallel = args.max_parallel;
        }
        debug!("creating plan with {} steps", params.steps.len());

        let plan = self
            .connect()
            .await?
            .create_plan(&params, &self.actor)
            .await
            .context("Failed to create plan")?;
        self.renderer.show(&CreateResult::new(plan))
    }

    async fn show_plan(&self, id: &str) -> Result<()> {
        let plan = self
            .connect()
            .await?
            .get_plan(id)
            .await
            .with_context(|| format!("Failed to load plan {id}"))?;
        self.renderer.show(&plan)
    }

    pub async fn show_active_plan(&self) -> Result<()> {
        let plan = self
            .connect()
            .await?
            .get_active_plan(&self.workspace)
            .await
            .context("Failed to look up the active plan")?;
        match plan {
            Some(plan) => self.renderer.show(&plan),
            None => self
                .renderer
                .render(&format!("No active plan in workspace {}.\n", self.workspace)),
        }
    }

    async fn approve_plan(&self, id: &str) -> Result<()> {
        let plan = self
            .connect()
            .await?
            .approve(id, &self.actor)
            .await
            .context("Failed to approve plan")?;
        let change = format!("Approved by {}", self.actor.id);
        self.renderer.show(&UpdateResult::with_changes(plan, vec![change]))
    }

    async fn reject_plan(&self, id: &str) -> Result<()> {
        let plan = self
            .connect()
            .await?
            .reject(id, &self.actor)
            .await
            .context("Failed to reject plan")?;
        let change = format!("Rejected by {}", self.actor.id);
        self.renderer.show(&UpdateResult::with_changes(plan, vec![change]))
    }

    async fn cancel_plan(&self, id: &str) -> Result<()> {
        let plan = self
            .connect()
            .await?
            .cancel(id, &self.actor)
            .await
            .context("Failed to cancel plan")?;
        let change = format!("Cancelled by {}", self.actor.id);
        self.renderer.show(&UpdateResult::with_changes(plan, vec![change]))
    }

    async fn advance_plan(&self, id: &str) -> Result<()> {
        let result = self
            .connect()
            .await?
            .advance(id, &self.actor)
            .await
            .context("Failed to advance plan")?;
        self.renderer.show(&result)
    }

    async fn set_auto_advance(&self, args: AutoAdvanceArgs) -> Result<()> {
        let enabled = args.state == Toggle::On;
        let plan = self
            .connect()
            .await?
            .set_auto_advance(&args.id, &self.actor, enabled)
            .await
            .context("Failed to change auto-advance")?;
        let change = format!("Auto-advance turned {}", if enabled { "on" } else { "off" });
        self.renderer.show(&UpdateResult::with_changes(plan, vec![change]))
    }

    async fn revise_plan(&self, args: RevisePlanArgs) -> Result<()> {
        let file: RevisionFile = input::read_json(&args.file)?;
        let coordinator = self.connect().await?;

        let revisions = file.into_revisions();
        let steps = coordinator
            .apply_revisions(&args.id, &self.actor, &revisions)
            .await
            .with_context(|| format!("Failed to revise plan {}; no revision was applied", args.id))?;

        for (revision, step) in revisions.iter().zip(steps) {
            match revision {
                Revision::InsertAfter { .. } => self.renderer.show(&CreateResult::new(step))?,
                Revision::UpdateParams { .. } => self.renderer.show(&UpdateResult::with_changes(
                    step,
                    vec!["Params replaced".to_string()],
                ))?,
                Revision::UpdateDescription { .. } => {
                    self.renderer.show(&UpdateResult::with_changes(
                        step,
                        vec!["Description updated".to_string()],
                    ))?
                }
                Revision::Skip { .. } => self.renderer.show(&UpdateResult::with_changes(
                    step,
                    vec!["Skipped".to_string()],
                ))?,
            }
        }
        Ok(())
    }

    async fn complete_step(&self, args: CompleteStepArgs) -> Result<()> {
        let result = input::result_value(args.result);
        let step = self
            .connect()
            .await?
            .complete_step(&args.id, result)
            .await
            .context("Failed to complete step")?;
        match step {
            Some(step) => self.renderer.show(&UpdateResult::with_changes(
                step,
                vec!["Marked as completed".to_string()],
            )),
            None => self.renderer.show(&OperationStatus::failure(format!(
                "Plan of step {} has ended; the result was ignored",
                args.id
            ))),
        }
    }

    async fn fail_step(&self, args: FailStepArgs) -> Result<()> {
        let failure = self
            .connect()
            .await?
            .fail_step(&args.id, &args.error)
            .await
            .context("Failed to record step failure")?;
        match failure {
            Some(failure) => self.renderer.show(&failure),
            None => self.renderer.show(&OperationStatus::failure(format!(
                "Plan of step {} has ended; the failure was ignored",
                args.id
            ))),
        }
    }

    async fn skip_step(&self, id: &str) -> Result<()> {
        let step = self
            .connect()
            .await?
            .skip_step(id)
            .await
            .context("Failed to skip step")?;
        self.renderer.show(&UpdateResult::with_changes(
            step,
            vec!["Skipped".to_string()],
        ))
    }

    async fn retry_step(&self, id: &str) -> Result<()> {
        let result: AdvanceResult = self
            .connect()
            .await?
            .retry_step(id)
            .await
            .context("Failed to retry step")?;
        self.renderer
            .show(&OperationStatus::success(format!("Step {id} is pending again")))?;
        self.renderer.show(&result)
    }
}
