use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BranchStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Pending,
    Reviewing,
    Approved,
    Merged,
    Unapproved,
    Reverted,
    NeedsChanges,
    Rejected,
}

impl BranchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchStatus::Pending => "pending",
            BranchStatus::Reviewing => "reviewing",
            BranchStatus::Approved => "approved",
            BranchStatus::Merged => "merged",
            BranchStatus::Unapproved => "unapproved",
            BranchStatus::Reverted => "reverted",
            BranchStatus::NeedsChanges => "needs_changes",
            BranchStatus::Rejected => "rejected",
        }
    }

    /// True if the branch is still in the review pipeline and shows up on
    /// the review dashboard.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            BranchStatus::Pending | BranchStatus::Reviewing | BranchStatus::Approved
        )
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BranchStatus {
    type Err = crate::error::GateflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BranchStatus::Pending),
            "reviewing" => Ok(BranchStatus::Reviewing),
            "approved" => Ok(BranchStatus::Approved),
            "merged" => Ok(BranchStatus::Merged),
            "unapproved" => Ok(BranchStatus::Unapproved),
            "reverted" => Ok(BranchStatus::Reverted),
            "needs_changes" => Ok(BranchStatus::NeedsChanges),
            "rejected" => Ok(BranchStatus::Rejected),
            _ => Err(crate::error::GateflowError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Active,
    Complete,
    Blocked,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Active => "active",
            PhaseStatus::Complete => "complete",
            PhaseStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initialized,
    InProgress,
    Complete,
    Paused,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Initialized => "initialized",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Complete => "complete",
            WorkflowStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestChanges,
    Merge,
    Unapprove,
}

impl ReviewAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::RequestChanges => "request_changes",
            ReviewAction::Merge => "merge",
            ReviewAction::Unapprove => "unapprove",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn branch_status_roundtrip() {
        let all = [
            BranchStatus::Pending,
            BranchStatus::Reviewing,
            BranchStatus::Approved,
            BranchStatus::Merged,
            BranchStatus::Unapproved,
            BranchStatus::Reverted,
            BranchStatus::NeedsChanges,
            BranchStatus::Rejected,
        ];
        for status in all {
            let parsed = BranchStatus::from_str(status.as_str()).unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn branch_status_invalid() {
        assert!(BranchStatus::from_str("bogus").is_err());
        assert!(BranchStatus::from_str("").is_err());
    }

    #[test]
    fn open_statuses() {
        assert!(BranchStatus::Pending.is_open());
        assert!(BranchStatus::Reviewing.is_open());
        assert!(BranchStatus::Approved.is_open());
        assert!(!BranchStatus::Merged.is_open());
        assert!(!BranchStatus::Rejected.is_open());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&BranchStatus::NeedsChanges).unwrap();
        assert_eq!(json, "\"needs_changes\"");
        let json = serde_json::to_string(&ReviewAction::RequestChanges).unwrap();
        assert_eq!(json, "\"request_changes\"");
        let json = serde_json::to_string(&WorkflowStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn phase_status_default_is_pending() {
        assert_eq!(PhaseStatus::default(), PhaseStatus::Pending);
    }
}
