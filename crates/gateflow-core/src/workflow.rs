use crate::branch::BranchState;
use crate::error::{GateflowError, Result};
use crate::graph::DependencyGraph;
use crate::io;
use crate::paths;
use crate::phase::Phase;
use crate::types::{PhaseStatus, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Root aggregate for one feature's workflow.
///
/// `current_phase` is 0 while no phase has been activated, otherwise the
/// order of a phase that is Active or Complete. Persisted as lock-guarded
/// JSON after every mutating operation; the persistence entry points are
/// `create`/`load`/`save` and nothing else in the core touches the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub feature: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub current_phase: u32,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub branches: BTreeMap<String, BranchState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(feature: impl Into<String>, phases: Vec<Phase>) -> Self {
        let now = Utc::now();
        Self {
            feature: feature.into(),
            status: WorkflowStatus::Initialized,
            current_phase: 0,
            phases,
            branches: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Initialize and persist a new workflow. Rejected if one already exists.
    pub fn create(root: &Path, feature: impl Into<String>, phases: Vec<Phase>) -> Result<Self> {
        let path = paths::workflow_state_path(root);
        if path.exists() {
            let existing = Self::load(root)?;
            return Err(GateflowError::WorkflowExists(existing.feature));
        }
        let mut workflow = Self::new(feature, phases);
        workflow.status = WorkflowStatus::InProgress;
        workflow.save(root)?;
        Ok(workflow)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::workflow_state_path(root);
        if !path.exists() {
            return Err(GateflowError::WorkflowNotFound);
        }
        io::read_locked_json(&path)
    }

    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        io::write_locked_json(&paths::workflow_state_path(root), self)
    }

    // ---------------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------------

    pub fn phase(&self, order: u32) -> Result<&Phase> {
        self.phases
            .iter()
            .find(|p| p.order == order)
            .ok_or(GateflowError::PhaseNotFound(order))
    }

    pub fn phase_mut(&mut self, order: u32) -> Result<&mut Phase> {
        self.phases
            .iter_mut()
            .find(|p| p.order == order)
            .ok_or(GateflowError::PhaseNotFound(order))
    }

    /// The active phase, if any phase has been activated yet.
    pub fn current(&self) -> Option<&Phase> {
        if self.current_phase == 0 {
            return None;
        }
        self.phases.iter().find(|p| p.order == self.current_phase)
    }

    pub fn branch(&self, name: &str) -> Result<&BranchState> {
        self.branches
            .get(name)
            .ok_or_else(|| GateflowError::BranchNotFound(name.to_string()))
    }

    pub fn branch_mut(&mut self, name: &str) -> Result<&mut BranchState> {
        self.branches
            .get_mut(name)
            .ok_or_else(|| GateflowError::BranchNotFound(name.to_string()))
    }

    /// Rebuild the dependency graph from the branch table.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, branch) in &self.branches {
            for dep in &branch.dependencies {
                graph.add_edge(name, dep);
            }
        }
        graph
    }

    pub fn completed_phase_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Complete)
            .count()
    }

    // ---------------------------------------------------------------------------
    // Invariants
    // ---------------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let mut orders = HashSet::new();
        for phase in &self.phases {
            if phase.order == 0 {
                errors.push(format!("phase '{}' has order 0", phase.name));
            }
            if !orders.insert(phase.order) {
                errors.push(format!("duplicate phase order {}", phase.order));
            }
        }

        if self.current_phase != 0 {
            match self.phases.iter().find(|p| p.order == self.current_phase) {
                None => errors.push(format!(
                    "current_phase {} does not reference an existing phase",
                    self.current_phase
                )),
                Some(p) if !matches!(p.status, PhaseStatus::Active | PhaseStatus::Complete) => {
                    errors.push(format!(
                        "current phase {} has status {} (expected active or complete)",
                        p.order, p.status
                    ))
                }
                Some(_) => {}
            }
        }

        for (name, branch) in &self.branches {
            if !orders.contains(&branch.phase) {
                errors.push(format!(
                    "branch '{name}' references unknown phase {}",
                    branch.phase
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GateflowError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::default_phases;
    use tempfile::TempDir;

    #[test]
    fn create_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let workflow =
            WorkflowState::create(dir.path(), "user-auth", default_phases()).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::InProgress);
        assert_eq!(workflow.current_phase, 0);

        let loaded = WorkflowState::load(dir.path()).unwrap();
        assert_eq!(loaded.feature, "user-auth");
        assert_eq!(loaded.phases.len(), 8);
    }

    #[test]
    fn reinitialization_rejected() {
        let dir = TempDir::new().unwrap();
        WorkflowState::create(dir.path(), "first", default_phases()).unwrap();
        let second = WorkflowState::create(dir.path(), "second", default_phases());
        assert!(matches!(second, Err(GateflowError::WorkflowExists(f)) if f == "first"));
    }

    #[test]
    fn load_without_state_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WorkflowState::load(dir.path()),
            Err(GateflowError::WorkflowNotFound)
        ));
    }

    #[test]
    fn validate_catches_dangling_branch_phase() {
        let mut workflow = WorkflowState::new("f", default_phases());
        workflow
            .branches
            .insert("ghost".into(), BranchState::new("ghost", "x", 99));
        assert!(matches!(
            workflow.validate(),
            Err(GateflowError::Validation(_))
        ));
    }

    #[test]
    fn validate_catches_bad_current_phase() {
        let mut workflow = WorkflowState::new("f", default_phases());
        workflow.current_phase = 42;
        assert!(workflow.validate().is_err());

        workflow.current_phase = 1; // phase 1 is still Pending
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn validate_accepts_fresh_state() {
        let workflow = WorkflowState::new("f", default_phases());
        workflow.validate().unwrap();
    }

    #[test]
    fn dependency_graph_rebuilds_from_branches() {
        let mut workflow = WorkflowState::new("f", default_phases());
        let mut b = BranchState::new("b", "x", 1);
        b.dependencies.push("a".into());
        workflow.branches.insert("a".into(), BranchState::new("a", "x", 1));
        workflow.branches.insert("b".into(), b);

        let graph = workflow.dependency_graph();
        assert_eq!(graph.all_dependents_of("a"), vec!["b"]);
    }
}
