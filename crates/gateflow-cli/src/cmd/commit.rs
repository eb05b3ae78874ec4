use crate::output::print_json;
use anyhow::Context;
use gateflow_core::{
    config::Config,
    engine::Engine,
    vcs::GitCli,
    workflow::WorkflowState,
};
use std::path::Path;

/// Record the commit at HEAD into the workflow. The commit itself is made
/// with git; gateflow tracks it against the active phase's branch, spawning
/// a work branch first when HEAD sits on a protected branch.
pub fn run(
    root: &Path,
    message: &str,
    role: Option<&str>,
    depends_on: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    let result = {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.record_commit(message, role, depends_on)
    };
    state.save(root).context("failed to save workflow state")?;
    let record = result.context("failed to record commit")?;

    if json {
        print_json(&serde_json::json!({
            "branch": record.branch,
            "role": record.role,
            "phase": record.phase,
            "created_branch": record.created_branch,
        }))?;
    } else {
        if record.created_branch {
            println!("Created branch: {}", record.branch);
        }
        println!("Recorded commit on '{}'", record.branch);
        println!("Role: {}", record.role);
        println!("Phase: {}", record.phase);
    }
    Ok(())
}
