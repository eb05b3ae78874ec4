mod cmd;
mod migrations;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    backup::BackupSubcommand, phase::PhaseSubcommand, review::ReviewSubcommand,
    skill::SkillSubcommand, version::VersionSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gateflow",
    about = "Role-gated git workflow orchestration with versioned pipelines",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .gateflow/ or .git/)
    #[arg(long, global = true, env = "GATEFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gateflow in the current project
    Init,

    /// Start a workflow for a feature
    Start {
        /// Feature name
        feature: String,
    },

    /// Record the commit at HEAD into the workflow
    Commit {
        /// Commit message to record
        #[arg(long, short = 'm')]
        message: String,

        /// Role attributed to the commit (default: the active phase's role)
        #[arg(long)]
        role: Option<String>,

        /// Declare a dependency on another workflow branch (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },

    /// Review branches: list, approve, reject, request changes, unapprove
    Review {
        #[command(subcommand)]
        subcommand: ReviewSubcommand,
    },

    /// Show workflow status
    Status,

    /// Phase operations
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Show the review history of every branch
    History,

    /// Pipeline version operations
    Version {
        #[command(subcommand)]
        subcommand: VersionSubcommand,
    },

    /// Manage state backups
    Backup {
        #[command(subcommand)]
        subcommand: BackupSubcommand,
    },

    /// Inspect skills and resolve pipeline requirements
    Skill {
        #[command(subcommand)]
        subcommand: SkillSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Start { feature } => cmd::start::run(&root, &feature, cli.json),
        Commands::Commit {
            message,
            role,
            depends_on,
        } => cmd::commit::run(&root, &message, role.as_deref(), &depends_on, cli.json),
        Commands::Review { subcommand } => cmd::review::run(&root, subcommand, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand, cli.json),
        Commands::History => cmd::history::run(&root, cli.json),
        Commands::Version { subcommand } => cmd::version::run(&root, subcommand, cli.json),
        Commands::Backup { subcommand } => cmd::backup::run(&root, subcommand, cli.json),
        Commands::Skill { subcommand } => cmd::skill::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
