use crate::error::{GateflowError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GATEFLOW_DIR: &str = ".gateflow";
pub const BACKUPS_DIR: &str = ".gateflow/backups";
pub const SCHEMAS_DIR: &str = ".gateflow/schemas";
pub const VERSIONS_DIR: &str = ".gateflow/versions";
pub const SKILLS_DIR: &str = ".gateflow/skills";

pub const CONFIG_FILE: &str = ".gateflow/config.yaml";
pub const WORKFLOW_STATE_FILE: &str = ".gateflow/workflow-state.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn gateflow_dir(root: &Path) -> PathBuf {
    root.join(GATEFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn workflow_state_path(root: &Path) -> PathBuf {
    root.join(WORKFLOW_STATE_FILE)
}

pub fn backups_dir(root: &Path) -> PathBuf {
    root.join(BACKUPS_DIR)
}

pub fn schemas_dir(root: &Path) -> PathBuf {
    root.join(SCHEMAS_DIR)
}

pub fn versions_dir(root: &Path) -> PathBuf {
    root.join(VERSIONS_DIR)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

pub fn skill_dir(root: &Path, name: &str) -> PathBuf {
    skills_dir(root).join(name)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(GateflowError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Lowercase `text` and collapse every non-alphanumeric run into a single
/// hyphen. Used for role and feature segments of generated branch names.
pub fn to_slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["user-auth", "a", "feature-123", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in [
            "",
            "-starts-with-dash",
            "ends-with-dash-",
            "has spaces",
            "UPPER",
            "a_b",
        ] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn to_slug_normalizes() {
        assert_eq!(to_slug("Software Engineer"), "software-engineer");
        assert_eq!(to_slug("UI/UX Designer"), "ui-ux-designer");
        assert_eq!(to_slug("  Payment  Flow!  "), "payment-flow");
        assert_eq!(to_slug("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.gateflow/config.yaml")
        );
        assert_eq!(
            workflow_state_path(root),
            PathBuf::from("/tmp/proj/.gateflow/workflow-state.json")
        );
        assert_eq!(
            skill_dir(root, "review-bot"),
            PathBuf::from("/tmp/proj/.gateflow/skills/review-bot")
        );
    }
}
