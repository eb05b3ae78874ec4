use crate::output::{print_json, print_table};
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
pub enum ReviewSubcommand {
    /// Show branches awaiting review
    List,
    /// Move a pending branch into review
    Start { branch: String },
    /// Approve a branch and merge it
    Approve {
        branch: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value = "you")]
        actor: String,
    },
    /// Reject a branch
    Reject {
        branch: String,
        #[arg(long)]
        reason: String,
        /// Delete the git branch instead of keeping it for fixes
        #[arg(long)]
        delete_branch: bool,
        #[arg(long, default_value = "you")]
        actor: String,
    },
    /// Request changes on a branch
    RequestChanges {
        branch: String,
        #[arg(long)]
        comment: String,
        #[arg(long, default_value = "you")]
        actor: String,
    },
    /// Revert a merged branch, optionally cascading to its dependents
    Unapprove {
        branch: String,
        #[arg(long)]
        cascade: bool,
        #[arg(long, default_value = "you")]
        actor: String,
    },
}

pub fn run(root: &Path, subcmd: ReviewSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ReviewSubcommand::List => list(root, json),
        ReviewSubcommand::Start { branch } => start(root, &branch, json),
        ReviewSubcommand::Approve {
            branch,
            comment,
            actor,
        } => approve(root, &branch, comment, &actor, json),
        ReviewSubcommand::Reject {
            branch,
            reason,
            delete_branch,
            actor,
        } => reject(root, &branch, &reason, !delete_branch, &actor, json),
        ReviewSubcommand::RequestChanges {
            branch,
            comment,
            actor,
        } => request_changes(root, &branch, &comment, &actor, json),
        ReviewSubcommand::Unapprove {
            branch,
            cascade,
            actor,
        } => unapprove(root, &branch, cascade, &actor, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = WorkflowState::load(root).context("failed to load workflow")?;
    let open: Vec<_> = state
        .branches
        .values()
        .filter(|b| b.status.is_open())
        .collect();

    if json {
        let summaries: Vec<_> = open
            .iter()
            .map(|b| {
                serde_json::json!({
                    "name": b.name,
                    "role": b.role,
                    "phase": b.phase,
                    "status": b.status.to_string(),
                    "commits": b.commits.len(),
                })
            })
            .collect();
        print_json(&summaries)?;
        return Ok(());
    }

    if open.is_empty() {
        println!("No branches pending review.");
        return Ok(());
    }

    println!("Feature: {}", state.feature);
    println!(
        "Phase {}/{}",
        state.current_phase,
        state.phases.len()
    );
    println!();
    let rows: Vec<Vec<String>> = open
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.role.clone(),
                b.phase.to_string(),
                b.commits.len().to_string(),
                b.status.to_string(),
            ]
        })
        .collect();
    print_table(&["BRANCH", "ROLE", "PHASE", "COMMITS", "STATUS"], rows);
    Ok(())
}

fn start(root: &Path, branch: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.begin_review(branch)?;
    }
    state.save(root).context("failed to save workflow state")?;

    if json {
        print_json(&serde_json::json!({ "branch": branch, "status": "reviewing" }))?;
    } else {
        println!("'{branch}' is now in review");
    }
    Ok(())
}

fn approve(
    root: &Path,
    branch: &str,
    comment: Option<String>,
    actor: &str,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    // The approval is recorded even when the merge fails, so persist the
    // state before surfacing the error.
    let result = {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.approve(branch, actor, comment)
    };
    state.save(root).context("failed to save workflow state")?;
    let report = result.with_context(|| format!("failed to merge '{branch}'"))?;

    if json {
        print_json(&serde_json::json!({
            "branch": report.branch,
            "merge_commit": report.merge_commit,
            "branch_deleted": report.branch_deleted,
            "phase_completed": report.phase_completed,
        }))?;
        return Ok(());
    }

    println!("Approved and merged '{}'", report.branch);
    println!("Merge commit: {}", report.merge_commit);
    if report.branch_deleted {
        println!("Deleted branch {}", report.branch);
    }
    if let Some(order) = report.phase_completed {
        println!("Phase {order} complete");
    }
    match report.advance {
        Some(PhaseAdvance::Activated {
            order,
            name,
            role,
            branch,
        }) => {
            println!("Phase {order} ({name}) is now active");
            println!("Role: {role}");
            println!("Branch: {branch}");
        }
        Some(PhaseAdvance::WorkflowComplete) => {
            println!("All phases complete. Workflow finished.");
        }
        None => {}
    }
    Ok(())
}

fn reject(
    root: &Path,
    branch: &str,
    reason: &str,
    keep_branch: bool,
    actor: &str,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    let result = {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.reject(branch, actor, reason, keep_branch)
    };
    state.save(root).context("failed to save workflow state")?;
    let deleted = result.with_context(|| format!("failed to reject '{branch}'"))?;

    if json {
        print_json(&serde_json::json!({
            "branch": branch,
            "status": "rejected",
            "reason": reason,
            "branch_deleted": deleted,
        }))?;
    } else {
        println!("Rejected '{branch}': {reason}");
        if deleted {
            println!("Deleted branch {branch}");
        } else {
            println!("Branch kept for fixes. Commit again to resubmit.");
        }
    }
    Ok(())
}

fn request_changes(
    root: &Path,
    branch: &str,
    comment: &str,
    actor: &str,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.request_changes(branch, actor, comment)?;
    }
    state.save(root).context("failed to save workflow state")?;

    if json {
        print_json(&serde_json::json!({
            "branch": branch,
            "status": "needs_changes",
            "comment": comment,
        }))?;
    } else {
        println!("Changes requested on '{branch}': {comment}");
        println!("Commit again to resubmit.");
    }
    Ok(())
}

fn unapprove(root: &Path, branch: &str, cascade: bool, actor: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let mut state = WorkflowState::load(root).context("failed to load workflow")?;
    let git = GitCli::new(root);

    let result = {
        let mut engine = Engine::new(&mut state, &config, &git);
        engine.unapprove(branch, actor, cascade)
    };
    state.save(root).context("failed to save workflow state")?;
    let report = result.with_context(|| format!("failed to unapprove '{branch}'"))?;

    for skipped in &report.skipped {
        tracing::warn!(branch = %skipped, "no merge commit on record, nothing to revert");
    }

    if json {
        print_json(&serde_json::json!({
            "reverted": report.reverted,
            "skipped": report.skipped,
        }))?;
        return Ok(());
    }

    println!("Reverted {} branch(es):", report.reverted.len());
    for name in &report.reverted {
        println!("  - {name}");
    }
    if !report.skipped.is_empty() {
        println!("Skipped (never merged):");
        for name in &report.skipped {
            println!("  - {name}");
        }
    }
    println!();
    println!("Fix the issues and commit to resubmit.");
    Ok(())
}
