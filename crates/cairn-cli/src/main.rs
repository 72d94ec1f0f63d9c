//! Cairn CLI Application
//!
//! Command-line front end for the cairn plan execution engine.

mod args;
mod cli;
mod exec;
mod input;
mod renderer;
mod runner;

use anyhow::Result;
use args::{Args, Commands};
use cairn_core::CoordinatorBuilder;
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let actor = args.actor();
    let Args { database_file, no_color, workspace, command, .. } = args;

    let cli = Cli::new(
        CoordinatorBuilder::new().with_database_path(database_file),
        TerminalRenderer::new(!no_color),
        actor,
        workspace,
    );

    info!("Cairn started as {}", cli.actor.id);

    match command {
        Some(Plan { command }) => cli.handle_plan_command(command).await,
        Some(Step { command }) => cli.handle_step_command(command).await,
        None => cli.show_active_plan().await,
    }
}
