use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateflowError {
    #[error("not initialized: run 'gateflow init'")]
    NotInitialized,

    #[error("workflow already exists for feature '{0}'")]
    WorkflowExists(String),

    #[error("no workflow initialized: run 'gateflow start <feature>'")]
    WorkflowNotFound,

    #[error("branch not found in workflow: {0}")]
    BranchNotFound(String),

    #[error("phase not found: {0}")]
    PhaseNotFound(u32),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("version not available: {0}")]
    VersionNotFound(String),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{command} failed with exit code {code}: {stderr}")]
    ExternalCommand {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{command} timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    #[error("migration failed: {message}{}", backup_hint(.backup_id))]
    MigrationFailure {
        message: String,
        backup_id: Option<String>,
    },

    #[error("could not acquire lock on {0} within timeout")]
    LockTimeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn backup_hint(backup_id: &Option<String>) -> String {
    match backup_id {
        Some(id) => format!(" (backup available: {id})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, GateflowError>;
