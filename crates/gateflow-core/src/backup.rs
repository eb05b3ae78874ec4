use crate::error::{GateflowError, Result};
use crate::io;
use crate::version::SemanticVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// BackupMeta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMeta {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_version: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_version: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl BackupMeta {
    /// Metadata for a new backup; id and timestamp are filled in by
    /// [`BackupManager::create`].
    pub fn for_operation(
        pipeline: impl Into<String>,
        from_version: Option<SemanticVersion>,
        to_version: Option<SemanticVersion>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            backup_id: String::new(),
            timestamp: Utc::now(),
            pipeline: Some(pipeline.into()),
            from_version,
            to_version,
            operation: Some(operation.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// BackupManager
// ---------------------------------------------------------------------------

/// Immutable state snapshots under a backups directory, one subdirectory per
/// backup holding `state.json` and `metadata.json`. Backups are deleted only
/// by explicit `delete`/`cleanup`.
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot `state` under a time-derived id. Millisecond precision keeps
    /// ids from colliding within a second.
    pub fn create(&self, state: &Value, mut meta: BackupMeta) -> Result<String> {
        let now = Utc::now();
        let backup_id = format!("backup_{}", now.format("%Y%m%d_%H%M%S%3f"));
        let backup_dir = self.dir.join(&backup_id);
        io::ensure_dir(&backup_dir)?;

        meta.backup_id = backup_id.clone();
        meta.timestamp = now;

        let state_json = serde_json::to_string_pretty(state)?;
        io::atomic_write(&backup_dir.join("state.json"), state_json.as_bytes())?;
        let meta_json = serde_json::to_string_pretty(&meta)?;
        io::atomic_write(&backup_dir.join("metadata.json"), meta_json.as_bytes())?;

        Ok(backup_id)
    }

    pub fn restore(&self, backup_id: &str) -> Result<Value> {
        let state_file = self.dir.join(backup_id).join("state.json");
        if !state_file.exists() {
            return Err(GateflowError::BackupNotFound(backup_id.to_string()));
        }
        let data = std::fs::read_to_string(&state_file)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn metadata(&self, backup_id: &str) -> Result<BackupMeta> {
        let meta_file = self.dir.join(backup_id).join("metadata.json");
        if !meta_file.exists() {
            return Err(GateflowError::BackupNotFound(backup_id.to_string()));
        }
        let data = std::fs::read_to_string(&meta_file)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// All backups, newest first. Entries with unreadable metadata are
    /// skipped rather than failing the listing.
    pub fn list(&self) -> Result<Vec<BackupMeta>> {
        let mut backups = Vec::new();
        if !self.dir.exists() {
            return Ok(backups);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let meta_file = entry.path().join("metadata.json");
            let Ok(data) = std::fs::read_to_string(&meta_file) else {
                continue;
            };
            if let Ok(meta) = serde_json::from_str::<BackupMeta>(&data) {
                backups.push(meta);
            }
        }
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    pub fn delete(&self, backup_id: &str) -> Result<bool> {
        let backup_dir = self.dir.join(backup_id);
        if !backup_dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&backup_dir)?;
        Ok(true)
    }

    /// Delete all but the `keep_count` most recent backups. Returns the
    /// number deleted.
    pub fn cleanup(&self, keep_count: usize) -> Result<usize> {
        let backups = self.list()?;
        if backups.len() <= keep_count {
            return Ok(0);
        }
        let mut deleted = 0;
        for meta in &backups[keep_count..] {
            if self.delete(&meta.backup_id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn manager() -> (TempDir, BackupManager) {
        let dir = TempDir::new().unwrap();
        let manager = BackupManager::new(dir.path().join("backups"));
        (dir, manager)
    }

    fn meta() -> BackupMeta {
        BackupMeta::for_operation(
            "gateflow",
            Some(SemanticVersion::new(1, 0, 0)),
            Some(SemanticVersion::new(2, 0, 0)),
            "update",
        )
    }

    #[test]
    fn create_restore_roundtrip() {
        let (_dir, manager) = manager();
        let state = json!({"version": "1.0.0", "feature": "auth"});
        let id = manager.create(&state, meta()).unwrap();
        assert!(id.starts_with("backup_"));

        let restored = manager.restore(&id).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn restore_unknown_id_fails() {
        let (_dir, manager) = manager();
        assert!(matches!(
            manager.restore("backup_19700101_000000000"),
            Err(GateflowError::BackupNotFound(_))
        ));
    }

    #[test]
    fn metadata_carries_operation_and_versions() {
        let (_dir, manager) = manager();
        let id = manager.create(&json!({}), meta()).unwrap();
        let stored = manager.metadata(&id).unwrap();
        assert_eq!(stored.backup_id, id);
        assert_eq!(stored.operation.as_deref(), Some("update"));
        assert_eq!(stored.from_version, Some(SemanticVersion::new(1, 0, 0)));
        assert_eq!(stored.to_version, Some(SemanticVersion::new(2, 0, 0)));
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, manager) = manager();
        let a = manager.create(&json!({"n": 1}), meta()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = manager.create(&json!({"n": 2}), meta()).unwrap();

        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].backup_id, b);
        assert_eq!(listed[1].backup_id, a);
    }

    #[test]
    fn delete_reports_existence() {
        let (_dir, manager) = manager();
        let id = manager.create(&json!({}), meta()).unwrap();
        assert!(manager.delete(&id).unwrap());
        assert!(!manager.delete(&id).unwrap());
    }

    #[test]
    fn cleanup_keeps_most_recent() {
        let (_dir, manager) = manager();
        let mut ids = Vec::new();
        for n in 0..4 {
            ids.push(manager.create(&json!({ "n": n }), meta()).unwrap());
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let deleted = manager.cleanup(2).unwrap();
        assert_eq!(deleted, 2);
        let remaining = manager.list().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].backup_id, ids[3]);
        assert_eq!(remaining[1].backup_id, ids[2]);
    }

    #[test]
    fn cleanup_noop_under_threshold() {
        let (_dir, manager) = manager();
        manager.create(&json!({}), meta()).unwrap();
        assert_eq!(manager.cleanup(10).unwrap(), 0);
    }
}
