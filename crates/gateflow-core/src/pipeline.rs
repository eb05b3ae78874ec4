use crate::error::{GateflowError, Result};
use crate::version::SemanticVersion;
use std::path::Path;

// ---------------------------------------------------------------------------
// PipelineVersions
// ---------------------------------------------------------------------------

/// The version graph of one pipeline: its current version and the sorted set
/// of versions available in the version store.
#[derive(Debug, Clone)]
pub struct PipelineVersions {
    pub name: String,
    pub current: SemanticVersion,
    available: Vec<SemanticVersion>,
}

impl PipelineVersions {
    pub fn new(
        name: impl Into<String>,
        current: SemanticVersion,
        mut available: Vec<SemanticVersion>,
    ) -> Self {
        available.sort();
        available.dedup();
        Self {
            name: name.into(),
            current,
            available,
        }
    }

    /// Build the available set from the subdirectories of a version store.
    /// Entries that are not version-shaped are ignored.
    pub fn from_dir(
        name: impl Into<String>,
        current: SemanticVersion,
        versions_dir: &Path,
    ) -> Result<Self> {
        let mut available = Vec::new();
        if versions_dir.exists() {
            for entry in std::fs::read_dir(versions_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let dir_name = entry.file_name().to_string_lossy().into_owned();
                if let Ok(version) = SemanticVersion::parse(&dir_name) {
                    available.push(version);
                }
            }
        }
        Ok(Self::new(name, current, available))
    }

    pub fn available(&self) -> &[SemanticVersion] {
        &self.available
    }

    /// The newest available version, if it strictly exceeds the current one.
    pub fn check_updates(&self) -> Option<SemanticVersion> {
        self.available
            .iter()
            .copied()
            .max()
            .filter(|latest| *latest > self.current)
    }

    /// Ordered versions to migrate through, ending at `target`.
    ///
    /// Greedy nearest-next: from the current version, repeatedly take the
    /// smallest available version strictly greater than the cursor. A gap in
    /// the available set (or a target that is not in it) is a hard error,
    /// never a truncated path.
    pub fn migration_path(&self, target: SemanticVersion) -> Result<Vec<SemanticVersion>> {
        if target <= self.current {
            return Err(GateflowError::Precondition(format!(
                "target version {target} is not newer than current {}",
                self.current
            )));
        }
        let mut path = Vec::new();
        let mut cursor = self.current;
        while cursor < target {
            let next = self
                .available
                .iter()
                .copied()
                .filter(|v| *v > cursor)
                .min()
                .ok_or_else(|| {
                    GateflowError::VersionNotFound(format!(
                        "no migration path from {cursor} to {target}"
                    ))
                })?;
            if next > target {
                return Err(GateflowError::VersionNotFound(format!(
                    "version {target} is not in the available set"
                )));
            }
            path.push(next);
            cursor = next;
        }
        Ok(path)
    }

    /// Mirror of `migration_path`: the largest available version strictly
    /// less than the cursor, descending toward `target`.
    pub fn rollback_path(&self, target: SemanticVersion) -> Result<Vec<SemanticVersion>> {
        if target >= self.current {
            return Err(GateflowError::Precondition(format!(
                "target version {target} is not older than current {}",
                self.current
            )));
        }
        let mut path = Vec::new();
        let mut cursor = self.current;
        while cursor > target {
            let prev = self
                .available
                .iter()
                .copied()
                .filter(|v| *v < cursor)
                .max()
                .ok_or_else(|| {
                    GateflowError::VersionNotFound(format!(
                        "no rollback path from {cursor} to {target}"
                    ))
                })?;
            if prev < target {
                return Err(GateflowError::VersionNotFound(format!(
                    "version {target} is not in the available set"
                )));
            }
            path.push(prev);
            cursor = prev;
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
