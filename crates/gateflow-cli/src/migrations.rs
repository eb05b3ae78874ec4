use gateflow_core::migrate::MigrationRegistry;

/// Compiled migration table for the gateflow pipeline state.
///
/// Transforms are registered per exact `(from, to)` version pair and run by
/// `gateflow version update` / `rollback`. Schema v1.0.0 is the initial
/// schema, so the table starts empty; when a new schema version lands, add
/// its forward and reverse transforms here:
///
/// ```rust,ignore
/// registry.register(v("1.0.0"), v("2.0.0"), |mut state| {
///     state["stages"] = migrate_stage_list(&state)?;
///     Ok(state)
/// });
/// ```
pub fn registry() -> MigrationRegistry {
    MigrationRegistry::new()
}
