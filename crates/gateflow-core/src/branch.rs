use crate::types::{BranchStatus, ReviewAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CommitInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ReviewEvent
// ---------------------------------------------------------------------------

/// One write-once entry of a branch's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub action: ReviewAction,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit: Option<String>,
}

impl ReviewEvent {
    pub fn new(action: ReviewAction, actor: impl Into<String>) -> Self {
        Self {
            action,
            actor: actor.into(),
            timestamp: Utc::now(),
            comment: None,
            reason: None,
            merge_commit: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_merge_commit(mut self, commit: impl Into<String>) -> Self {
        self.merge_commit = Some(commit.into());
        self
    }
}

// ---------------------------------------------------------------------------
// BranchState
// ---------------------------------------------------------------------------

/// Review lifecycle state of one work branch.
///
/// Created on the first commit to a non-protected branch, never physically
/// deleted from the workflow even if the underlying git branch is. Status
/// transitions are one-directional except `Merged -> Unapproved` (explicit
/// reversal) and `Rejected`/`NeedsChanges -> Pending` (resubmission via a
/// new commit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchState {
    pub name: String,
    pub role: String,
    /// Order of the phase this branch belongs to.
    pub phase: u32,
    pub status: BranchStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unapproved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unapproved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub dependents: Vec<String>,
    #[serde(default)]
    pub review_history: Vec<ReviewEvent>,
}

impl BranchState {
    pub fn new(name: impl Into<String>, role: impl Into<String>, phase: u32) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            phase,
            status: BranchStatus::Pending,
            created_at: Utc::now(),
            commits: Vec::new(),
            merge_commit: None,
            approved_by: None,
            approved_at: None,
            unapproved_by: None,
            unapproved_at: None,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            review_history: Vec::new(),
        }
    }

    /// Append to the audit trail. Events are never edited or removed.
    pub fn record_event(&mut self, event: ReviewEvent) {
        self.review_history.push(event);
    }

    pub fn last_event(&self) -> Option<&ReviewEvent> {
        self.review_history.last()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_branch_starts_pending() {
        let b = BranchState::new("software-engineer/auth-120301", "Software Engineer", 3);
        assert_eq!(b.status, BranchStatus::Pending);
        assert!(b.commits.is_empty());
        assert!(b.merge_commit.is_none());
        assert!(b.review_history.is_empty());
    }

    #[test]
    fn events_append_in_order() {
        let mut b = BranchState::new("x/y-1", "x", 1);
        b.record_event(ReviewEvent::new(ReviewAction::Approve, "lead").with_comment("lgtm"));
        b.record_event(ReviewEvent::new(ReviewAction::Merge, "lead").with_merge_commit("abc123"));
        assert_eq!(b.review_history.len(), 2);
        assert_eq!(b.review_history[0].action, ReviewAction::Approve);
        assert_eq!(b.last_event().unwrap().merge_commit.as_deref(), Some("abc123"));
    }

    #[test]
    fn serde_roundtrip_preserves_history() {
        let mut b = BranchState::new("qa/checkout-090000", "QA Engineer", 4);
        b.record_event(ReviewEvent::new(ReviewAction::Reject, "lead").with_reason("flaky test"));
        let json = serde_json::to_string(&b).unwrap();
        let parsed: BranchState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.review_history.len(), 1);
        assert_eq!(parsed.review_history[0].reason.as_deref(), Some("flaky test"));
        assert_eq!(parsed.phase, 4);
    }

    #[test]
    fn optional_fields_not_serialized_when_unset() {
        let b = BranchState::new("a/b-1", "a", 1);
        let json = serde_json::to_string(&b).unwrap();
        assert!(!json.contains("merge_commit"));
        assert!(!json.contains("approved_by"));
    }
}
