//! Workflow engine: phase advancement and the branch review lifecycle.
//!
//! The engine mutates a borrowed [`WorkflowState`] and delegates every git
//! action to the [`Vcs`] port. Preconditions are checked before the first
//! external side effect, so precondition failures are cheap and leave no
//! partial VCS state. Once a VCS sequence has started, a failing step aborts
//! immediately and the engine does not attempt to undo steps already applied
//! to the repository — an operator may need to clean up a half-rebased
//! working tree by hand.
//!
//! State mutations that precede a failing VCS step (an approval recorded
//! before its merge fails, for example) are preserved; callers persist the
//! state regardless of the returned result, matching the audit-trail
//! semantics of the review history.

use crate::branch::{BranchState, CommitInfo, ReviewEvent};
use crate::config::Config;
use crate::error::{GateflowError, Result};
use crate::paths;
use crate::types::{BranchStatus, PhaseStatus, ReviewAction, WorkflowStatus};
use crate::vcs::{self, Vcs};
use crate::workflow::WorkflowState;
use chrono::Utc;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CommitRecord {
    pub branch: String,
    pub role: String,
    pub phase: u32,
    pub created_branch: bool,
}

#[derive(Debug)]
pub enum PhaseAdvance {
    Activated {
        order: u32,
        name: String,
        role: String,
        branch: String,
    },
    WorkflowComplete,
}

#[derive(Debug)]
pub struct MergeReport {
    pub branch: String,
    pub merge_commit: String,
    pub branch_deleted: bool,
    pub phase_completed: Option<u32>,
    pub advance: Option<PhaseAdvance>,
}

#[derive(Debug)]
pub struct UnapproveReport {
    /// Reverted, most recently approved first.
    pub reverted: Vec<String>,
    /// Members of the cascade set with no recorded merge commit.
    pub skipped: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<'a> {
    state: &'a mut WorkflowState,
    config: &'a Config,
    vcs: &'a dyn Vcs,
}

impl<'a> Engine<'a> {
    pub fn new(state: &'a mut WorkflowState, config: &'a Config, vcs: &'a dyn Vcs) -> Self {
        Self { state, config, vcs }
    }

    // ---------------------------------------------------------------------------
    // Commits
    // ---------------------------------------------------------------------------

    /// Record the commit at HEAD into the workflow.
    ///
    /// Creates the branch's [`BranchState`] on first contact, spawning a work
    /// branch first when HEAD sits on a protected branch and policy allows.
    /// A commit to a Rejected or NeedsChanges branch resubmits it (back to
    /// Pending).
    pub fn record_commit(
        &mut self,
        message: &str,
        role: Option<&str>,
        depends_on: &[String],
    ) -> Result<CommitRecord> {
        if self.state.current_phase == 0 {
            return Err(GateflowError::Precondition(
                "no active phase; run 'gateflow phase next' to activate the first phase".into(),
            ));
        }
        let order = self.state.current_phase;
        let phase_role = self.state.phase(order)?.role.clone();
        let feature = self.state.feature.clone();
        let role = role.unwrap_or(&phase_role).to_string();

        for dep in depends_on {
            if !self.state.branches.contains_key(dep) {
                return Err(GateflowError::BranchNotFound(dep.clone()));
            }
        }

        let out = self.vcs.current_branch()?.require("resolve current branch")?;
        let mut branch_name = out.stdout.trim().to_string();
        let mut created_branch = false;

        if self.config.protection.is_protected(&branch_name) {
            if !self.config.workflow.auto_create_branch {
                return Err(GateflowError::Precondition(format!(
                    "cannot commit to protected branch '{branch_name}'; create a work branch first"
                )));
            }
            let generated = generate_branch_name(&role, &feature);
            vcs::validate_branch_name(&generated)?;
            self.vcs.create_branch(&generated)?.require("create branch")?;
            branch_name = generated;
            created_branch = true;
        }

        let head = self
            .vcs
            .current_head_commit()?
            .require("resolve head commit")?;
        let commit = CommitInfo {
            id: head.stdout.trim().to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        };

        let branch = self
            .state
            .branches
            .entry(branch_name.clone())
            .or_insert_with(|| BranchState::new(branch_name.clone(), role.clone(), order));
        if matches!(
            branch.status,
            BranchStatus::Rejected | BranchStatus::NeedsChanges
        ) {
            branch.status = BranchStatus::Pending;
        }
        branch.commits.push(commit);
        for dep in depends_on {
            if !branch.dependencies.contains(dep) {
                branch.dependencies.push(dep.clone());
            }
        }
        for dep in depends_on {
            if let Some(dep_state) = self.state.branches.get_mut(dep) {
                if !dep_state.dependents.contains(&branch_name) {
                    dep_state.dependents.push(branch_name.clone());
                }
            }
        }

        self.state.phase_mut(order)?.branch = Some(branch_name.clone());

        Ok(CommitRecord {
            branch: branch_name,
            role,
            phase: order,
            created_branch,
        })
    }

    // ---------------------------------------------------------------------------
    // Review lifecycle
    // ---------------------------------------------------------------------------

    /// Move a Pending branch into review.
    pub fn begin_review(&mut self, branch_name: &str) -> Result<()> {
        let branch = self.state.branch_mut(branch_name)?;
        if branch.status != BranchStatus::Pending {
            return Err(GateflowError::InvalidTransition {
                from: branch.status.to_string(),
                to: BranchStatus::Reviewing.to_string(),
                reason: "only a pending branch can enter review".to_string(),
            });
        }
        branch.status = BranchStatus::Reviewing;
        Ok(())
    }

    /// Approve a branch and immediately merge it.
    pub fn approve(
        &mut self,
        branch_name: &str,
        actor: &str,
        comment: Option<String>,
    ) -> Result<MergeReport> {
        {
            let branch = self.state.branch_mut(branch_name)?;
            if branch.status == BranchStatus::Merged {
                return Err(GateflowError::Precondition(format!(
                    "branch '{branch_name}' is already merged"
                )));
            }
            branch.status = BranchStatus::Approved;
            branch.approved_by = Some(actor.to_string());
            branch.approved_at = Some(Utc::now());
            let mut event = ReviewEvent::new(ReviewAction::Approve, actor);
            if let Some(comment) = comment {
                event = event.with_comment(comment);
            }
            branch.record_event(event);
        }
        self.merge(branch_name, actor)
    }

    /// Merge an approved branch into the base branch.
    ///
    /// Sequence: checkout base, pull, checkout branch, rebase onto base,
    /// checkout base, merge --no-ff. The first failing step aborts the
    /// sequence with the branch state untouched.
    pub fn merge(&mut self, branch_name: &str, actor: &str) -> Result<MergeReport> {
        let (order, dependencies, status) = {
            let branch = self.state.branch(branch_name)?;
            (branch.phase, branch.dependencies.clone(), branch.status)
        };
        if status != BranchStatus::Approved {
            return Err(GateflowError::Precondition(format!(
                "branch '{branch_name}' must be approved before merge (status: {status})"
            )));
        }
        if self.config.merge.require_dependencies_merged {
            for dep in &dependencies {
                let merged = self
                    .state
                    .branches
                    .get(dep)
                    .map(|d| d.status == BranchStatus::Merged)
                    .unwrap_or(false);
                if !merged {
                    return Err(GateflowError::Precondition(format!(
                        "dependency '{dep}' of '{branch_name}' is not merged"
                    )));
                }
            }
        }

        let base = self.config.merge.base_branch.clone();
        self.vcs.checkout(&base)?.require("checkout base")?;
        self.vcs.pull()?.require("pull base")?;
        self.vcs.checkout(branch_name)?.require("checkout branch")?;
        self.vcs.rebase(&base)?.require("rebase onto base")?;
        self.vcs.checkout(&base)?.require("checkout base")?;
        self.vcs.merge(branch_name, true)?.require("merge branch")?;
        let head = self
            .vcs
            .current_head_commit()?
            .require("resolve merge commit")?;
        let merge_commit = head.stdout.trim().to_string();

        {
            let branch = self.state.branch_mut(branch_name)?;
            branch.merge_commit = Some(merge_commit.clone());
            branch.status = BranchStatus::Merged;
            branch.record_event(
                ReviewEvent::new(ReviewAction::Merge, actor).with_merge_commit(merge_commit.clone()),
            );
        }

        let mut branch_deleted = false;
        if self.config.merge.delete_branch_after_merge {
            branch_deleted = self.vcs.delete_branch(branch_name)?.success();
        }

        let phase_completed = self.complete_phase_if_merged(order)?;
        let advance = if phase_completed.is_some() && self.config.workflow.auto_phase_transition {
            Some(self.advance()?)
        } else {
            None
        };

        Ok(MergeReport {
            branch: branch_name.to_string(),
            merge_commit,
            branch_deleted,
            phase_completed,
            advance,
        })
    }

    pub fn reject(
        &mut self,
        branch_name: &str,
        actor: &str,
        reason: &str,
        keep_branch: bool,
    ) -> Result<bool> {
        {
            let branch = self.state.branch_mut(branch_name)?;
            if branch.status == BranchStatus::Merged {
                return Err(GateflowError::Precondition(format!(
                    "branch '{branch_name}' is already merged; use 'review unapprove' instead"
                )));
            }
            branch.status = BranchStatus::Rejected;
            branch.record_event(ReviewEvent::new(ReviewAction::Reject, actor).with_reason(reason));
        }
        let mut deleted = false;
        if !keep_branch {
            deleted = self.vcs.delete_branch(branch_name)?.success();
        }
        Ok(deleted)
    }

    pub fn request_changes(&mut self, branch_name: &str, actor: &str, comment: &str) -> Result<()> {
        let branch = self.state.branch_mut(branch_name)?;
        if branch.status == BranchStatus::Merged {
            return Err(GateflowError::Precondition(format!(
                "branch '{branch_name}' is already merged; use 'review unapprove' instead"
            )));
        }
        branch.status = BranchStatus::NeedsChanges;
        branch.record_event(
            ReviewEvent::new(ReviewAction::RequestChanges, actor).with_comment(comment),
        );
        Ok(())
    }

    /// Revert a merged branch, optionally cascading to everything that
    /// transitively depends on it.
    ///
    /// The cascade set is reverted in descending `approved_at` order so that
    /// dependents merged after their dependency are unwound before the
    /// dependency itself. A member without a recorded merge commit is
    /// skipped: it was never actually merged, so there is nothing to revert.
    pub fn unapprove(
        &mut self,
        branch_name: &str,
        actor: &str,
        cascade: bool,
    ) -> Result<UnapproveReport> {
        if self.state.branch(branch_name)?.status != BranchStatus::Merged {
            return Err(GateflowError::Precondition(format!(
                "branch '{branch_name}' is not merged; use 'review reject' instead"
            )));
        }
        if !self.config.unapproval.allow_unapprove_after_merge {
            return Err(GateflowError::Precondition(
                "unapproval after merge is disabled by configuration".into(),
            ));
        }

        let mut targets = vec![branch_name.to_string()];
        if cascade {
            targets.extend(
                self.state
                    .dependency_graph()
                    .all_dependents_of(branch_name),
            );
        }
        targets.sort_by(|a, b| {
            let approved_a = self.state.branches.get(a).and_then(|s| s.approved_at);
            let approved_b = self.state.branches.get(b).and_then(|s| s.approved_at);
            approved_b.cmp(&approved_a)
        });

        let mut reverted = Vec::new();
        let mut skipped = Vec::new();
        for name in targets {
            if self.revert_branch(&name, actor)? {
                reverted.push(name);
            } else {
                skipped.push(name);
            }
        }
        Ok(UnapproveReport { reverted, skipped })
    }

    fn revert_branch(&mut self, name: &str, actor: &str) -> Result<bool> {
        let merge_commit = self
            .state
            .branches
            .get(name)
            .and_then(|b| b.merge_commit.clone());
        let Some(commit) = merge_commit else {
            return Ok(false);
        };
        self.vcs
            .checkout(&self.config.merge.base_branch)?
            .require("checkout base")?;
        self.vcs.revert(&commit, 1)?.require("revert merge commit")?;

        let branch = self.state.branch_mut(name)?;
        branch.status = BranchStatus::Unapproved;
        branch.unapproved_by = Some(actor.to_string());
        branch.unapproved_at = Some(Utc::now());
        branch.record_event(ReviewEvent::new(ReviewAction::Unapprove, actor));
        Ok(true)
    }

    // ---------------------------------------------------------------------------
    // Phase lifecycle
    // ---------------------------------------------------------------------------

    /// Mark the phase Complete when its bound branch has merged.
    fn complete_phase_if_merged(&mut self, order: u32) -> Result<Option<u32>> {
        let bound = {
            let phase = self.state.phase(order)?;
            if phase.status != PhaseStatus::Active {
                return Ok(None);
            }
            phase.branch.clone()
        };
        let Some(bound) = bound else {
            return Ok(None);
        };
        let merged = self
            .state
            .branches
            .get(&bound)
            .map(|b| b.status == BranchStatus::Merged)
            .unwrap_or(false);
        if !merged {
            return Ok(None);
        }
        self.state.phase_mut(order)?.complete();
        Ok(Some(order))
    }

    /// Explicit phase advancement: requires the current phase to be Complete
    /// (its bound branch merged), then activates the next one.
    pub fn phase_next(&mut self) -> Result<PhaseAdvance> {
        if self.state.current_phase == 0 {
            return self.advance();
        }
        let order = self.state.current_phase;
        self.complete_phase_if_merged(order)?;
        let phase = self.state.phase(order)?;
        if phase.status != PhaseStatus::Complete {
            return Err(GateflowError::Precondition(format!(
                "phase {} ({}) is not complete yet",
                phase.order, phase.name
            )));
        }
        self.advance()
    }

    /// Activate the phase after the current one, or finish the workflow when
    /// none is left. Generates and binds a deterministic work branch name.
    pub fn advance(&mut self) -> Result<PhaseAdvance> {
        let next_order = self.state.current_phase + 1;
        if self.state.phases.iter().all(|p| p.order != next_order) {
            self.state.status = WorkflowStatus::Complete;
            return Ok(PhaseAdvance::WorkflowComplete);
        }

        self.ensure_activatable(next_order)?;
        let feature = self.state.feature.clone();
        let phase = self.state.phase_mut(next_order)?;
        phase.activate();
        let branch = generate_branch_name(&phase.role, &feature);
        phase.branch = Some(branch.clone());
        let name = phase.name.clone();
        let role = phase.role.clone();
        self.state.current_phase = next_order;

        Ok(PhaseAdvance::Activated {
            order: next_order,
            name,
            role,
            branch,
        })
    }

    /// A phase can start when the nearest preceding *required* phase is
    /// Complete (or it is phase 1) and its declared phase dependencies are
    /// all Complete.
    fn ensure_activatable(&self, order: u32) -> Result<()> {
        if order > 1 {
            let preceding_required = self
                .state
                .phases
                .iter()
                .filter(|p| p.order < order && p.required)
                .max_by_key(|p| p.order);
            if let Some(prev) = preceding_required {
                if prev.status != PhaseStatus::Complete {
                    return Err(GateflowError::Precondition(format!(
                        "phase {} ({}) must be complete before phase {} can start",
                        prev.order, prev.name, order
                    )));
                }
            }
        }
        for &dep in &self.state.phase(order)?.dependencies {
            if self.state.phase(dep)?.status != PhaseStatus::Complete {
                return Err(GateflowError::Precondition(format!(
                    "phase {order} depends on phase {dep} which is not complete"
                )));
            }
        }
        Ok(())
    }
}

/// `role-slug/feature-slug-HHMMSS`; the time suffix disambiguates repeated
/// runs within a day.
pub fn generate_branch_name(role: &str, feature: &str) -> String {
    let short_id = Utc::now().format("%H%M%S");
    format!(
        "{}/{}-{}",
        paths::to_slug(role),
        paths::to_slug(feature),
        short_id
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
