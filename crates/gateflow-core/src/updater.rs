//! Update and rollback orchestration for pipeline state.
//!
//! An update is: resolve the migration path, snapshot the state, apply the
//! chain, validate the end state against the destination version's schema.
//! Every failure after the snapshot carries the backup id so the caller can
//! restore by hand; a schema-invalid end state is treated exactly like a
//! failed migration.

use crate::backup::{BackupManager, BackupMeta};
use crate::error::{GateflowError, Result};
use crate::migrate::{MigrationExecutor, MigrationRegistry};
use crate::pipeline::PipelineVersions;
use crate::schema::SchemaStore;
use crate::version::SemanticVersion;
use serde_json::Value;

// ---------------------------------------------------------------------------
// UpdateOutcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UpdateOutcome {
    /// Versions migrated through, in order. Empty for a backup restore.
    pub path: Vec<SemanticVersion>,
    /// Snapshot taken before the chain ran; `None` on a dry run.
    pub backup_id: Option<String>,
    /// The migrated (or restored) state; `None` on a dry run. The caller is
    /// responsible for persisting it and bumping the recorded version.
    pub state: Option<Value>,
}

// ---------------------------------------------------------------------------
// PipelineUpdater
// ---------------------------------------------------------------------------

pub struct PipelineUpdater<'a> {
    pub versions: &'a PipelineVersions,
    pub registry: &'a MigrationRegistry,
    pub backups: &'a BackupManager,
    pub schemas: &'a SchemaStore,
}

impl PipelineUpdater<'_> {
    pub fn update_to(
        &self,
        target: SemanticVersion,
        state: &Value,
        dry_run: bool,
    ) -> Result<UpdateOutcome> {
        let path = self.versions.migration_path(target)?;
        if dry_run {
            return Ok(UpdateOutcome {
                path,
                backup_id: None,
                state: None,
            });
        }

        let meta = BackupMeta::for_operation(
            &self.versions.name,
            Some(self.versions.current),
            Some(target),
            "update",
        );
        let backup_id = self.backups.create(state, meta)?;

        let executor = MigrationExecutor::new(self.registry);
        let migrated = executor
            .apply_chain(state, self.versions.current, &path)
            .map_err(|e| attach_backup(e, &backup_id))?;
        self.validate_destination(target, &migrated, &backup_id)?;

        Ok(UpdateOutcome {
            path,
            backup_id: Some(backup_id),
            state: Some(migrated),
        })
    }

    /// Roll back to `target`, either by restoring a named backup or by
    /// executing registered reverse migrations along the rollback path.
    ///
    /// Reverse pairs are checked up front: a gap fails the whole rollback
    /// before any state is touched, pointing the caller at backup restore
    /// as the alternative.
    pub fn rollback_to(
        &self,
        target: SemanticVersion,
        state: &Value,
        backup_id: Option<&str>,
    ) -> Result<UpdateOutcome> {
        if let Some(id) = backup_id {
            let restored = self.backups.restore(id)?;
            return Ok(UpdateOutcome {
                path: Vec::new(),
                backup_id: Some(id.to_string()),
                state: Some(restored),
            });
        }

        let path = self.versions.rollback_path(target)?;
        let mut cursor = self.versions.current;
        for &next in &path {
            if !self.registry.contains(cursor, next) {
                return Err(GateflowError::Precondition(format!(
                    "no reverse migration registered from {cursor} to {next}; \
                     restore from a backup instead"
                )));
            }
            cursor = next;
        }

        let meta = BackupMeta::for_operation(
            &self.versions.name,
            Some(self.versions.current),
            Some(target),
            "rollback",
        );
        let backup_id = self.backups.create(state, meta)?;

        let executor = MigrationExecutor::new(self.registry);
        let migrated = executor
            .apply_chain(state, self.versions.current, &path)
            .map_err(|e| attach_backup(e, &backup_id))?;
        self.validate_destination(target, &migrated, &backup_id)?;

        Ok(UpdateOutcome {
            path,
            backup_id: Some(backup_id),
            state: Some(migrated),
        })
    }

    /// Schema check for the destination version. A version without a schema
    /// file passes; a schema that exists must validate.
    fn validate_destination(
        &self,
        version: SemanticVersion,
        state: &Value,
        backup_id: &str,
    ) -> Result<()> {
        let name = format!("{version}/schema");
        if self.schemas.load(&name)?.is_none() {
            return Ok(());
        }
        let (ok, errors) = self.schemas.validate(state, &name)?;
        if !ok {
            return Err(GateflowError::MigrationFailure {
                message: format!(
                    "migrated state failed schema validation for {version}: {}",
                    errors.join("; ")
                ),
                backup_id: Some(backup_id.to_string()),
            });
        }
        Ok(())
    }
}

fn attach_backup(e: GateflowError, backup_id: &str) -> GateflowError {
    match e {
        GateflowError::MigrationFailure { message, .. } => GateflowError::MigrationFailure {
            message,
            backup_id: Some(backup_id.to_string()),
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
