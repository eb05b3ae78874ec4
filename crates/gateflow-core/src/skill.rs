//! Versioned skill management.
//!
//! A skill is a pluggable capability module living under the skills
//! directory as `<name>/config.json` (current version) plus
//! `<name>/versions/<x.y.z>/capabilities.json` manifests. Pipelines declare
//! skill requirements as a preferred version or a simple min/max window;
//! resolution picks the newest version inside the window.

use crate::error::{GateflowError, Result};
use crate::version::SemanticVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillCapabilities {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub compatible_pipelines: Vec<String>,
}

/// A pipeline's requirement on one skill.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillRequirement {
    /// Exact preferred version, tried before the min/max window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<SemanticVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<SemanticVersion>,
}

#[derive(Debug, Clone, Deserialize)]
struct SkillConfig {
    #[serde(default)]
    version: Option<SemanticVersion>,
}

// ---------------------------------------------------------------------------
// CompareOp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Gt,
    Eq,
    Le,
    Lt,
}

impl std::str::FromStr for CompareOp {
    type Err = GateflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">=" => Ok(CompareOp::Ge),
            ">" => Ok(CompareOp::Gt),
            "==" => Ok(CompareOp::Eq),
            "<=" => Ok(CompareOp::Le),
            "<" => Ok(CompareOp::Lt),
            _ => Err(GateflowError::InvalidStatus(format!(
                "unknown comparison operator '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// SkillVersions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SkillVersions {
    pub name: String,
    pub current: SemanticVersion,
    available: Vec<SemanticVersion>,
    capabilities: BTreeMap<SemanticVersion, SkillCapabilities>,
}

impl SkillVersions {
    pub fn load(skills_dir: &Path, name: &str) -> Result<Self> {
        let skill_dir = skills_dir.join(name);
        if !skill_dir.exists() {
            return Err(GateflowError::SkillNotFound(name.to_string()));
        }

        let current = read_skill_config(&skill_dir)
            .unwrap_or(None)
            .unwrap_or(SemanticVersion::new(1, 0, 0));

        let mut available = Vec::new();
        let mut capabilities = BTreeMap::new();
        let versions_dir = skill_dir.join("versions");
        if versions_dir.exists() {
            for entry in std::fs::read_dir(&versions_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let dir_name = entry.file_name().to_string_lossy().into_owned();
                let Ok(version) = SemanticVersion::parse(&dir_name) else {
                    continue;
                };
                available.push(version);
                let manifest = entry.path().join("capabilities.json");
                if let Ok(data) = std::fs::read_to_string(&manifest) {
                    if let Ok(caps) = serde_json::from_str::<SkillCapabilities>(&data) {
                        capabilities.insert(version, caps);
                    }
                }
            }
        }
        available.sort();

        Ok(Self {
            name: name.to_string(),
            current,
            available,
            capabilities,
        })
    }

    pub fn available(&self) -> &[SemanticVersion] {
        &self.available
    }

    pub fn capabilities(&self, version: SemanticVersion) -> Option<&SkillCapabilities> {
        self.capabilities.get(&version)
    }

    /// Does the installed version satisfy `<op> required`?
    pub fn check_requirement(&self, op: CompareOp, required: SemanticVersion) -> bool {
        match op {
            CompareOp::Ge => self.current >= required,
            CompareOp::Gt => self.current > required,
            CompareOp::Eq => self.current == required,
            CompareOp::Le => self.current <= required,
            CompareOp::Lt => self.current < required,
        }
    }

    /// Newest available version inside the min/max window.
    pub fn find_compatible(
        &self,
        min: Option<SemanticVersion>,
        max: Option<SemanticVersion>,
    ) -> Option<SemanticVersion> {
        self.available
            .iter()
            .copied()
            .filter(|v| min.map_or(true, |m| *v >= m))
            .filter(|v| max.map_or(true, |m| *v <= m))
            .max()
    }
}

fn read_skill_config(skill_dir: &Path) -> Result<Option<SemanticVersion>> {
    let config_file = skill_dir.join("config.json");
    if !config_file.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&config_file)?;
    let config: SkillConfig = serde_json::from_str(&data)?;
    Ok(config.version)
}

// ---------------------------------------------------------------------------
// SkillRegistry
// ---------------------------------------------------------------------------

pub struct SkillRegistry {
    skills: BTreeMap<String, SkillVersions>,
}

impl SkillRegistry {
    /// Discover every skill under `skills_dir`. A directory counts as a
    /// skill when it has a `config.json` or a `versions/` store.
    pub fn load(skills_dir: &Path) -> Result<Self> {
        let mut skills = BTreeMap::new();
        if skills_dir.exists() {
            for entry in std::fs::read_dir(skills_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let dir = entry.path();
                if !dir.join("config.json").exists() && !dir.join("versions").exists() {
                    continue;
                }
                let skill = SkillVersions::load(skills_dir, &name)?;
                skills.insert(name, skill);
            }
        }
        Ok(Self { skills })
    }

    pub fn get(&self, name: &str) -> Option<&SkillVersions> {
        self.skills.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skills.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillVersions> {
        self.skills.values()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// `(skill, version)` pairs providing `capability`, optionally at or
    /// above `min_version`.
    pub fn find_for_capability(
        &self,
        capability: &str,
        min_version: Option<SemanticVersion>,
    ) -> Vec<(String, SemanticVersion)> {
        let mut results = Vec::new();
        for skill in self.skills.values() {
            for (&version, caps) in &skill.capabilities {
                if !caps.capabilities.iter().any(|c| c == capability) {
                    continue;
                }
                if min_version.map_or(true, |m| version >= m) {
                    results.push((skill.name.clone(), version));
                }
            }
        }
        results
    }

    /// Resolve a pipeline's skill requirements to concrete versions.
    ///
    /// The preferred version wins when it is actually available; otherwise
    /// the newest version inside the min/max window. Missing skills and
    /// unsatisfiable windows are collected as error strings rather than
    /// failing fast, so the caller can report everything at once.
    pub fn resolve_requirements(
        &self,
        requirements: &BTreeMap<String, SkillRequirement>,
    ) -> (BTreeMap<String, SemanticVersion>, Vec<String>) {
        let mut resolved = BTreeMap::new();
        let mut errors = Vec::new();

        for (name, requirement) in requirements {
            let Some(skill) = self.get(name) else {
                errors.push(format!("skill '{name}' not found"));
                continue;
            };

            if let Some(preferred) = requirement.version {
                if skill.available().contains(&preferred) {
                    resolved.insert(name.clone(), preferred);
                    continue;
                }
                errors.push(format!(
                    "preferred version {preferred} not available for '{name}'"
                ));
            }

            match skill.find_compatible(requirement.min_version, requirement.max_version) {
                Some(version) => {
                    resolved.insert(name.clone(), version);
                }
                None => errors.push(format!(
                    "no compatible version for '{name}' (min: {}, max: {})",
                    requirement
                        .min_version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "any".into()),
                    requirement
                        .max_version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "any".into()),
                )),
            }
        }

        (resolved, errors)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
