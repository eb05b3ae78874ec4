use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gateflow_core::{backup::BackupManager, paths};
use std::path::Path;

#[derive(Subcommand)]
pub enum BackupSubcommand {
    /// List backups, newest first
    List,
    /// Delete a backup by id
    Delete { backup_id: String },
    /// Delete old backups, keeping the N most recent
    Cleanup {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
}

pub fn run(root: &Path, subcmd: BackupSubcommand, json: bool) -> anyhow::Result<()> {
    let manager = BackupManager::new(paths::backups_dir(root));
    match subcmd {
        BackupSubcommand::List => list(&manager, json),
        BackupSubcommand::Delete { backup_id } => delete(&manager, &backup_id, json),
        BackupSubcommand::Cleanup { keep } => cleanup(&manager, keep, json),
    }
}

fn list(manager: &BackupManager, json: bool) -> anyhow::Result<()> {
    let backups = manager.list().context("failed to list backups")?;

    if json {
        print_json(&backups)?;
        return Ok(());
    }

    if backups.is_empty() {
        println!("No backups.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = backups
        .iter()
        .map(|b| {
            let span = match (b.from_version, b.to_version) {
                (Some(from), Some(to)) => format!("{from} -> {to}"),
                _ => String::new(),
            };
            vec![
                b.backup_id.clone(),
                b.operation.clone().unwrap_or_default(),
                span,
                b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    print_table(&["BACKUP", "OPERATION", "VERSIONS", "TIMESTAMP"], rows);
    Ok(())
}

fn delete(manager: &BackupManager, backup_id: &str, json: bool) -> anyhow::Result<()> {
    let deleted = manager.delete(backup_id).context("failed to delete backup")?;
    if !deleted {
        anyhow::bail!("backup not found: {backup_id}");
    }
    if json {
        print_json(&serde_json::json!({ "deleted": backup_id }))?;
    } else {
        println!("Deleted backup: {backup_id}");
    }
    Ok(())
}

fn cleanup(manager: &BackupManager, keep: usize, json: bool) -> anyhow::Result<()> {
    let deleted = manager.cleanup(keep).context("failed to clean up backups")?;
    if json {
        print_json(&serde_json::json!({ "deleted": deleted, "kept": keep }))?;
    } else {
        println!("Cleaned up {deleted} old backup(s)");
    }
    Ok(())
}
