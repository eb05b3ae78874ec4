use crate::output::print_json;
use anyhow::Context;
use gateflow_core::{config::Config, io, paths};
use std::path::Path;

/// Schema the initial pipeline version validates workflow state against.
const INITIAL_SCHEMA: &str = r#"{
  "required": ["feature", "status", "phases", "branches"],
  "properties": {
    "feature": { "type": "string" },
    "status": {
      "type": "string",
      "enum": ["initialized", "in_progress", "complete", "paused"]
    },
    "current_phase": { "type": "integer", "minimum": 0 },
    "phases": { "type": "array" },
    "branches": { "type": "object" }
  }
}
"#;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    io::ensure_dir(&paths::gateflow_dir(root)).context("failed to create .gateflow")?;
    io::ensure_dir(&paths::backups_dir(root))?;
    io::ensure_dir(&paths::schemas_dir(root))?;
    io::ensure_dir(&paths::skills_dir(root))?;

    let config = Config::load(root).context("failed to load config")?;
    let initial_version_dir = paths::versions_dir(root).join(config.version.to_string());
    io::ensure_dir(&initial_version_dir)?;

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        config.save(root).context("failed to write config")?;
    }

    let schema_path = initial_version_dir.join("schema.json");
    if !schema_path.exists() {
        io::atomic_write(&schema_path, INITIAL_SCHEMA.as_bytes())
            .context("failed to write initial schema")?;
    }
    let state_schema_path = paths::schemas_dir(root).join("workflow-state.json");
    if !state_schema_path.exists() {
        io::atomic_write(&state_schema_path, INITIAL_SCHEMA.as_bytes())
            .context("failed to write workflow-state schema")?;
    }

    if json {
        print_json(&serde_json::json!({
            "initialized": true,
            "pipeline": config.pipeline,
            "version": config.version.to_string(),
        }))?;
    } else {
        println!("Initialized gateflow (pipeline '{}', version {})", config.pipeline, config.version);
        println!("Next: gateflow start <feature>");
    }
    Ok(())
}
