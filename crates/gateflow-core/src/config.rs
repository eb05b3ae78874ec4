use crate::error::Result;
use crate::io;
use crate::paths;
use crate::phase::Phase;
use crate::skill::SkillRequirement;
use crate::version::SemanticVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// WorkflowPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// Commits landing on a protected branch spawn a work branch instead of
    /// failing.
    #[serde(default = "default_true")]
    pub auto_create_branch: bool,
    /// Advance to the next phase automatically after the merge that
    /// completes the current one.
    #[serde(default = "default_true")]
    pub auto_phase_transition: bool,
    #[serde(default)]
    pub allow_parallel_phases: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            auto_create_branch: true,
            auto_phase_transition: true,
            allow_parallel_phases: false,
        }
    }
}

// ---------------------------------------------------------------------------
// MergePolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePolicy {
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    #[serde(default = "default_true")]
    pub delete_branch_after_merge: bool,
    /// Every declared dependency of a branch must be Merged before the
    /// branch itself may merge.
    #[serde(default = "default_true")]
    pub require_dependencies_merged: bool,
}

fn default_base_branch() -> String {
    "main".to_string()
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            delete_branch_after_merge: true,
            require_dependencies_merged: true,
        }
    }
}

// ---------------------------------------------------------------------------
// UnapprovalPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnapprovalPolicy {
    #[serde(default = "default_true")]
    pub allow_unapprove_after_merge: bool,
    #[serde(default = "default_true")]
    pub preserve_branch_after_revert: bool,
}

impl Default for UnapprovalPolicy {
    fn default() -> Self {
        Self {
            allow_unapprove_after_merge: true,
            preserve_branch_after_revert: true,
        }
    }
}

// ---------------------------------------------------------------------------
// BranchProtection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchProtection {
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,
}

fn default_protected_branches() -> Vec<String> {
    vec![
        "main".to_string(),
        "master".to_string(),
        "production".to_string(),
    ]
}

impl Default for BranchProtection {
    fn default() -> Self {
        Self {
            protected_branches: default_protected_branches(),
        }
    }
}

impl BranchProtection {
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected_branches.iter().any(|b| b == branch)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_pipeline_name")]
    pub pipeline: String,
    /// Current pipeline schema version; bumped by update/rollback.
    #[serde(default = "default_pipeline_version")]
    pub version: SemanticVersion,
    #[serde(default)]
    pub workflow: WorkflowPolicy,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub unapproval: UnapprovalPolicy,
    #[serde(default)]
    pub protection: BranchProtection,
    /// Overrides the built-in phase table when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<Phase>,
    /// Skill requirements of this pipeline, resolved by `gateflow skill resolve`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skills: BTreeMap<String, SkillRequirement>,
}

fn default_pipeline_name() -> String {
    "gateflow".to_string()
}

fn default_pipeline_version() -> SemanticVersion {
    SemanticVersion::new(1, 0, 0)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline_name(),
            version: default_pipeline_version(),
            workflow: WorkflowPolicy::default(),
            merge: MergePolicy::default(),
            unapproval: UnapprovalPolicy::default(),
            protection: BranchProtection::default(),
            phases: Vec::new(),
            skills: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config, falling back to defaults when no file exists yet.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&path, data.as_bytes())
    }

    /// Phase table for a new workflow: config override or the built-in
    /// default, with runtime fields reset.
    pub fn workflow_phases(&self) -> Vec<Phase> {
        if self.phases.is_empty() {
            return crate::phase::default_phases();
        }
        self.phases
            .iter()
            .map(|p| {
                let mut phase = Phase::new(&p.name, &p.role, p.order, p.required);
                phase.dependencies = p.dependencies.clone();
                phase
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Defaults helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pipeline, "gateflow");
        assert_eq!(config.version, SemanticVersion::new(1, 0, 0));
        assert!(config.workflow.auto_create_branch);
        assert!(config.merge.require_dependencies_merged);
        assert_eq!(config.merge.base_branch, "main");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.version = SemanticVersion::new(2, 0, 0);
        config.merge.base_branch = "trunk".to_string();
        config.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.version, SemanticVersion::new(2, 0, 0));
        assert_eq!(loaded.merge.base_branch, "trunk");
    }

    #[test]
    fn partial_yaml_gets_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".gateflow")).unwrap();
        std::fs::write(
            dir.path().join(".gateflow/config.yaml"),
            "pipeline: payments\nmerge:\n  base_branch: develop\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pipeline, "payments");
        assert_eq!(config.merge.base_branch, "develop");
        // untouched sections keep their defaults
        assert!(config.merge.delete_branch_after_merge);
        assert!(config.protection.is_protected("main"));
    }

    #[test]
    fn protected_branch_check() {
        let protection = BranchProtection::default();
        assert!(protection.is_protected("main"));
        assert!(protection.is_protected("production"));
        assert!(!protection.is_protected("feature/x"));
    }

    #[test]
    fn workflow_phases_default_when_unset() {
        let config = Config::default();
        let phases = config.workflow_phases();
        assert_eq!(phases.len(), 8);
    }

    #[test]
    fn workflow_phases_from_config_reset_status() {
        let mut config = Config::default();
        let mut custom = Phase::new("Build", "Engineer", 1, true);
        custom.activate();
        config.phases = vec![custom];

        let phases = config.workflow_phases();
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].status, crate::types::PhaseStatus::Pending);
        assert!(phases[0].started_at.is_none());
    }
}
