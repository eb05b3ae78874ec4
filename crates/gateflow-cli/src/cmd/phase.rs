use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use gateflow_core::{
    config::Config,
    engine::{Engine, PhaseAdvance},
    vcs::GitCli,
    workflow::WorkflowState,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// Activate the next phase (requires the current one to be complete)
    Next,
}

pub fn run(root: &Path, subcmd: PhaseSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PhaseSubcommand::Next => next(root, json),
    }
}

fn next(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    let result = {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.phase_next()
    };
    state.save(root).context("failed to save workflow state")?;
    let advance = result.context("cannot advance phase")?;

    match advance {
        PhaseAdvance::Activated {
            order,
            name,
            role,
            branch,
        } => {
            if json {
                print_json(&serde_json::json!({
                    "phase": order,
                    "name": name,
                    "role": role,
                    "branch": branch,
                }))?;
            } else {
                println!("Phase {order} ({name}) is now active");
                println!("Role: {role}");
                println!("Branch: {branch}");
                println!();
                println!("To start: git checkout -b {branch}");
                println!("Then: gateflow commit -m <message>");
            }
        }
        PhaseAdvance::WorkflowComplete => {
            if json {
                print_json(&serde_json::json!({ "workflow_complete": true }))?;
            } else {
                println!("All phases complete. Workflow finished.");
            }
        }
    }
    Ok(())
}
