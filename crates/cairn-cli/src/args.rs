use std::path::PathBuf;

use cairn_core::{Actor, Role};
use clap::{Parser, Subcommand};

use crate::cli::{PlanCommands, StepCommands};

/// Command-line front end for the Cairn plan execution engine
///
/// Cairn stores plans proposed by a planner, gates them behind human
/// approval, and runs their steps in dependency order with a bounded number
/// of steps in flight. Use `plan run` to execute a plan with a local command
/// as the executor, or drive steps by hand with the `step` commands.
#[derive(Parser)]
#[command(version, about, name = "cairn")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/cairn/cairn.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Identity recorded as the author of plans and changes
    #[arg(long, global = true, default_value = "cli")]
    pub actor: String,

    /// Role of the actor: owner, editor or viewer
    #[arg(long, global = true, default_value = "owner")]
    pub role: Role,

    /// Workspace for new plans and for looking up the active plan
    #[arg(long, global = true, default_value = "default")]
    pub workspace: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    /// The actor this invocation acts as.
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor.clone(), self.role)
    }
}

/// Available commands for the Cairn CLI
///
/// - `plan`: create, approve, revise and run plans
/// - `step`: report results for steps executed by hand
///
/// Without a command, the active plan of the workspace is shown.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage steps within plans
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
}
