use crate::output::print_json;
use anyhow::Context;
use gateflow_core::workflow::WorkflowState;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = WorkflowState::load(root).context("failed to load workflow")?;

    if json {
        let entries: Vec<_> = state
            .branches
            .values()
            .map(|b| {
                serde_json::json!({
                    "branch": b.name,
                    "role": b.role,
                    "phase": b.phase,
                    "status": b.status.to_string(),
                    "review_history": b.review_history,
                })
            })
            .collect();
        print_json(&entries)?;
        return Ok(());
    }

    println!("Review history for '{}'", state.feature);
    println!();

    if state.branches.is_empty() {
        println!("No branches yet.");
        return Ok(());
    }

    for branch in state.branches.values() {
        println!("{} ({}, phase {})", branch.name, branch.status, branch.phase);
        if branch.review_history.is_empty() {
            println!("  no review events");
        }
        for event in &branch.review_history {
            println!(
                "  {} {} by {}",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.action,
                event.actor
            );
            if let Some(ref comment) = event.comment {
                println!("    comment: {comment}");
            }
            if let Some(ref reason) = event.reason {
                println!("    reason: {reason}");
            }
            if let Some(ref commit) = event.merge_commit {
                println!("    merge commit: {commit}");
            }
        }
        println!();
    }
    Ok(())
}
