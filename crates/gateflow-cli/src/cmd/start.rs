use crate::output::print_json;
use anyhow::Context;
use gateflow_core::{config::Config, workflow::WorkflowState};
use std::path::Path;

pub fn run(root: &Path, feature: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let workflow = WorkflowState::create(root, feature, config.workflow_phases())
        .context("failed to start workflow")?;

    if json {
        print_json(&serde_json::json!({
            "feature": workflow.feature,
            "status": workflow.status.to_string(),
            "phases": workflow.phases.len(),
        }))?;
    } else {
        println!("Workflow initialized for '{feature}'");
        println!("Phases: {}", workflow.phases.len());
        println!("Next: gateflow phase next");
    }
    Ok(())
}
