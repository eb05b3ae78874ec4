use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gateflow_core::{config::Config, paths, skill::SkillRegistry};
use std::path::Path;

#[derive(Subcommand)]
pub enum SkillSubcommand {
    /// List installed skills
    List,
    /// Show a skill's versions and capabilities
    Show { name: String },
    /// Resolve the pipeline's skill requirements to concrete versions
    Resolve,
}

pub fn run(root: &Path, subcmd: SkillSubcommand, json: bool) -> anyhow::Result<()> {
    let registry =
        SkillRegistry::load(&paths::skills_dir(root)).context("failed to load skills")?;
    match subcmd {
        SkillSubcommand::List => list(&registry, json),
        SkillSubcommand::Show { name } => show(&registry, &name, json),
        SkillSubcommand::Resolve => resolve(root, &registry, json),
    }
}

fn list(registry: &SkillRegistry, json: bool) -> anyhow::Result<()> {
    if json {
        let entries: Vec<_> = registry
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "current": s.current.to_string(),
                    "available": s.available().iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        print_json(&entries)?;
        return Ok(());
    }

    if registry.is_empty() {
        println!("No skills installed.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = registry
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.current.to_string(),
                s.available().len().to_string(),
            ]
        })
        .collect();
    print_table(&["SKILL", "CURRENT", "VERSIONS"], rows);
    Ok(())
}

fn show(registry: &SkillRegistry, name: &str, json: bool) -> anyhow::Result<()> {
    let skill = registry
        .get(name)
        .with_context(|| format!("skill '{name}' not found"))?;

    if json {
        let versions: Vec<_> = skill
            .available()
            .iter()
            .map(|&v| {
                serde_json::json!({
                    "version": v.to_string(),
                    "capabilities": skill
                        .capabilities(v)
                        .map(|c| c.capabilities.clone())
                        .unwrap_or_default(),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "name": skill.name,
            "current": skill.current.to_string(),
            "versions": versions,
        }))?;
        return Ok(());
    }

    println!("Skill: {}", skill.name);
    println!("Current: {}", skill.current);
    println!();
    for &version in skill.available() {
        let marker = if version == skill.current { " (current)" } else { "" };
        println!("  {version}{marker}");
        if let Some(caps) = skill.capabilities(version) {
            if !caps.capabilities.is_empty() {
                println!("    capabilities: {}", caps.capabilities.join(", "));
            }
        }
    }
    Ok(())
}

fn resolve(root: &Path, registry: &SkillRegistry, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if config.skills.is_empty() {
        if json {
            print_json(&serde_json::json!({ "resolved": {}, "errors": [] }))?;
        } else {
            println!("No skill requirements declared in config.");
        }
        return Ok(());
    }

    let (resolved, errors) = registry.resolve_requirements(&config.skills);

    if json {
        let resolved_strings: std::collections::BTreeMap<_, _> = resolved
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        print_json(&serde_json::json!({
            "resolved": resolved_strings,
            "errors": errors,
        }))?;
    } else {
        if !resolved.is_empty() {
            let rows: Vec<Vec<String>> = resolved
                .iter()
                .map(|(name, version)| vec![name.clone(), version.to_string()])
                .collect();
            print_table(&["SKILL", "RESOLVED"], rows);
        }
        for error in &errors {
            println!("error: {error}");
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("{} requirement(s) could not be resolved", errors.len());
    }
    Ok(())
}
