use crate::output::print_json;
use anyhow::Context;
use gateflow_core::{paths, schema::SchemaStore, workflow::WorkflowState};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = WorkflowState::load(root).context("failed to load workflow")?;

    // Both checks warn rather than fail: stale state should still be
    // inspectable.
    if let Err(e) = state.validate() {
        tracing::warn!("workflow state failed invariant check: {e}");
    }
    let schemas = SchemaStore::new(paths::schemas_dir(root));
    if let Ok(Some(_)) = schemas.load("workflow-state") {
        let raw = serde_json::to_value(&state)?;
        let (ok, errors) = schemas.validate(&raw, "workflow-state")?;
        if !ok {
            tracing::warn!("workflow state failed schema validation: {}", errors.join("; "));
        }
    }

    if json {
        print_json(&state)?;
        return Ok(());
    }

    println!("Feature: {}", state.feature);
    println!("Status:  {}", state.status);
    println!("Created: {}", state.created_at.format("%Y-%m-%d %H:%M"));
    println!();
    println!("Phase {}/{}", state.current_phase, state.phases.len());
    println!();

    for phase in &state.phases {
        let required = if phase.required { "" } else { " (optional)" };
        println!(
            "  {}. {} — {}{required} [{}]",
            phase.order, phase.name, phase.role, phase.status
        );
        if let Some(ref branch) = phase.branch {
            let branch_status = state
                .branches
                .get(branch)
                .map(|b| b.status.to_string())
                .unwrap_or_else(|| "untracked".to_string());
            println!("     branch: {branch} ({branch_status})");
        }
    }

    let open: Vec<_> = state
        .branches
        .values()
        .filter(|b| b.status.is_open())
        .collect();
    if !open.is_empty() {
        println!();
        println!("Pending reviews:");
        for branch in open {
            println!("  - {} ({})", branch.name, branch.status);
        }
    }

    let complete = state.completed_phase_count();
    let total = state.phases.len().max(1);
    println!();
    println!(
        "Progress: {}% ({complete}/{} phases complete)",
        complete * 100 / total,
        state.phases.len()
    );
    Ok(())
}
