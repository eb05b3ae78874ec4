use crate::types::PhaseStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// An ordered, role-scoped stage of a feature workflow.
///
/// Phases are created once at workflow initialization and never deleted,
/// only transitioned: `Pending -> Active -> Complete`. `Blocked` exists in
/// the model but the default flow never sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub role: String,
    /// 1-based, unique, monotonic.
    pub order: u32,
    pub required: bool,
    #[serde(default)]
    pub status: PhaseStatus,
    /// Work branch bound to this phase, set on activation or first commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Orders of phases that must be Complete before this one can start.
    /// Empty in the default configuration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Phase {
    pub fn new(name: impl Into<String>, role: impl Into<String>, order: u32, required: bool) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            order,
            required,
            status: PhaseStatus::Pending,
            branch: None,
            dependencies: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn activate(&mut self) {
        self.status = PhaseStatus::Active;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = PhaseStatus::Complete;
        self.completed_at = Some(Utc::now());
    }
}

/// The default phase table. Overridable from config.
pub fn default_phases() -> Vec<Phase> {
    [
        ("Requirements Gathering", "Client", true),
        ("Architecture Design", "Tech Lead", true),
        ("Implementation", "Software Engineer", true),
        ("Testing", "QA Engineer", true),
        ("Design", "UI/UX Designer", false),
        ("Documentation", "Documentation Specialist", false),
        ("Security Review", "Security Engineer", false),
        ("Deployment", "DevOps Engineer", true),
    ]
    .iter()
    .enumerate()
    .map(|(i, (name, role, required))| Phase::new(*name, *role, (i + 1) as u32, *required))
    .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
