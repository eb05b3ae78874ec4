use crate::migrations;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gateflow_core::{
    backup::BackupManager,
    config::Config,
    io, paths,
    pipeline::PipelineVersions,
    schema::SchemaStore,
    updater::PipelineUpdater,
    version::SemanticVersion,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum VersionSubcommand {
    /// Check whether a newer pipeline version is available
    Check,
    /// List available pipeline versions
    List,
    /// Update the pipeline to a newer version
    Update {
        /// Target version (default: newest available)
        #[arg(long)]
        to: Option<String>,
        /// Print the migration path without applying anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Roll the pipeline back to an older version
    Rollback {
        /// Target version
        #[arg(long)]
        to: String,
        /// Restore this backup instead of running reverse migrations
        #[arg(long)]
        backup: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: VersionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        VersionSubcommand::Check => check(root, json),
        VersionSubcommand::List => list(root, json),
        VersionSubcommand::Update { to, dry_run } => update(root, to.as_deref(), dry_run, json),
        VersionSubcommand::Rollback { to, backup } => {
            rollback(root, &to, backup.as_deref(), json)
        }
    }
}

fn load_versions(root: &Path, config: &Config) -> anyhow::Result<PipelineVersions> {
    PipelineVersions::from_dir(&config.pipeline, config.version, &paths::versions_dir(root))
        .context("failed to read version store")
}

/// The persisted workflow state is what migrations transform; a project
/// without a workflow yet migrates an empty object.
fn load_pipeline_state(root: &Path) -> anyhow::Result<serde_json::Value> {
    let path = paths::workflow_state_path(root);
    if !path.exists() {
        return Ok(serde_json::json!({}));
    }
    io::read_locked_json(&path).context("failed to read workflow state")
}

fn check(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let versions = load_versions(root, &config)?;

    match versions.check_updates() {
        Some(latest) => {
            if json {
                print_json(&serde_json::json!({
                    "update_available": true,
                    "latest": latest.to_string(),
                    "current": versions.current.to_string(),
                }))?;
            } else {
                println!("Update available: {latest}");
                println!("Current version: {}", versions.current);
            }
        }
        None => {
            if json {
                print_json(&serde_json::json!({
                    "update_available": false,
                    "current": versions.current.to_string(),
                }))?;
            } else {
                println!("No updates available. Current version: {}", versions.current);
            }
        }
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let versions = load_versions(root, &config)?;

    if json {
        print_json(&serde_json::json!({
            "current": versions.current.to_string(),
            "available": versions
                .available()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    if versions.available().is_empty() {
        println!("No versions in the store.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = versions
        .available()
        .iter()
        .map(|v| {
            vec![
                v.to_string(),
                if *v == versions.current {
                    "current".to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect();
    print_table(&["VERSION", ""], rows);
    Ok(())
}

fn update(root: &Path, to: Option<&str>, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root)?;
    let versions = load_versions(root, &config)?;
    let target = match to {
        Some(s) => s.parse::<SemanticVersion>()?,
        None => versions
            .check_updates()
            .context("no newer version available")?,
    };

    let registry = migrations::registry();
    let backups = BackupManager::new(paths::backups_dir(root));
    let schemas = SchemaStore::new(paths::versions_dir(root));
    let updater = PipelineUpdater {
        versions: &versions,
        registry: &registry,
        backups: &backups,
        schemas: &schemas,
    };

    let state = load_pipeline_state(root)?;
    let outcome = updater
        .update_to(target, &state, dry_run)
        .with_context(|| format!("failed to update to {target}"))?;

    let path_strings: Vec<String> = outcome.path.iter().map(|v| v.to_string()).collect();
    if dry_run {
        if json {
            print_json(&serde_json::json!({ "dry_run": true, "path": path_strings }))?;
        } else {
            println!("Would migrate through: {}", path_strings.join(" -> "));
        }
        return Ok(());
    }

    if let Some(new_state) = &outcome.state {
        io::write_locked_json(&paths::workflow_state_path(root), new_state)
            .context("failed to persist migrated state")?;
    }
    config.version = target;
    config.save(root).context("failed to record new version")?;

    if json {
        print_json(&serde_json::json!({
            "updated_to": target.to_string(),
            "path": path_strings,
            "backup": outcome.backup_id,
        }))?;
    } else {
        println!("Updated to version {target}");
        if let Some(backup) = outcome.backup_id {
            println!("Backup: {backup}");
        }
    }
    Ok(())
}

fn rollback(root: &Path, to: &str, backup: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root)?;
    let versions = load_versions(root, &config)?;
    let target = to.parse::<SemanticVersion>()?;

    let registry = migrations::registry();
    let backups = BackupManager::new(paths::backups_dir(root));
    let schemas = SchemaStore::new(paths::versions_dir(root));
    let updater = PipelineUpdater {
        versions: &versions,
        registry: &registry,
        backups: &backups,
        schemas: &schemas,
    };

    let state = load_pipeline_state(root)?;
    let outcome = updater
        .rollback_to(target, &state, backup)
        .with_context(|| format!("failed to roll back to {target}"))?;

    // A restored backup carries its own version; a path rollback lands on
    // the target.
    let recorded = outcome
        .state
        .as_ref()
        .and_then(|s| s.get("version"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<SemanticVersion>().ok())
        .unwrap_or(target);

    if let Some(new_state) = &outcome.state {
        io::write_locked_json(&paths::workflow_state_path(root), new_state)
            .context("failed to persist rolled-back state")?;
    }
    config.version = recorded;
    config.save(root).context("failed to record new version")?;

    if json {
        print_json(&serde_json::json!({
            "rolled_back_to": recorded.to_string(),
            "backup": outcome.backup_id,
        }))?;
    } else {
        println!("Rolled back to version {recorded}");
        if let Some(backup) = outcome.backup_id {
            println!("Backup: {backup}");
        }
    }
    Ok(())
}
