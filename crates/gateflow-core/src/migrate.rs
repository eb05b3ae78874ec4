//! Registry-dispatched state migrations.
//!
//! Migration functions are registered ahead of time in a compiled table
//! keyed by exact `(from, to)` version pairs — nothing is loaded or executed
//! from files at runtime. The executor applies a chain of pairs
//! all-or-nothing: the caller's input value is never mutated, so a failing
//! step leaves the pre-chain state untouched.

use crate::error::{GateflowError, Result};
use crate::version::SemanticVersion;
use serde_json::Value;
use std::collections::HashMap;

/// A pure state transform. Failures are reported as an error string and
/// surface as [`GateflowError::MigrationFailure`].
pub type MigrationFn = Box<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

// ---------------------------------------------------------------------------
// MigrationRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MigrationRegistry {
    entries: HashMap<(SemanticVersion, SemanticVersion), MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, from: SemanticVersion, to: SemanticVersion, migration: F)
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.entries.insert((from, to), Box::new(migration));
    }

    pub fn get(&self, from: SemanticVersion, to: SemanticVersion) -> Option<&MigrationFn> {
        self.entries.get(&(from, to))
    }

    pub fn contains(&self, from: SemanticVersion, to: SemanticVersion) -> bool {
        self.entries.contains_key(&(from, to))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MigrationExecutor
// ---------------------------------------------------------------------------

pub struct MigrationExecutor<'a> {
    registry: &'a MigrationRegistry,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(registry: &'a MigrationRegistry) -> Self {
        Self { registry }
    }

    /// Apply the exact-pair migration for each consecutive step of `path`,
    /// starting from `from`. Returns the fully migrated state.
    ///
    /// A missing exact pair is a hard failure even when the path itself is
    /// valid — there is no interpolation between registered pairs. On any
    /// failure the input is left untouched and no partial result escapes.
    pub fn apply_chain(
        &self,
        state: &Value,
        from: SemanticVersion,
        path: &[SemanticVersion],
    ) -> Result<Value> {
        let mut current = state.clone();
        let mut cursor = from;
        for &next in path {
            let migration = self.registry.get(cursor, next).ok_or_else(|| {
                GateflowError::MigrationFailure {
                    message: format!("no migration registered from {cursor} to {next}"),
                    backup_id: None,
                }
            })?;
            current = migration(current).map_err(|e| GateflowError::MigrationFailure {
                message: format!("migration {cursor} -> {next} failed: {e}"),
                backup_id: None,
            })?;
            if let Some(obj) = current.as_object_mut() {
                if obj.contains_key("version") {
                    obj.insert("version".to_string(), Value::String(next.to_string()));
                }
            }
            cursor = next;
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
