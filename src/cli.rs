use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::resource::capabilities::EntityKind;

#[derive(Parser)]
#[command(name = "hostenv")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative lifecycle management for database host environments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control plane host or base URL
    #[arg(long, env = "DCT_HOST", global = true)]
    pub host: Option<String>,

    /// API key for the control plane
    #[arg(long, env = "DCT_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Config file (default: ~/.config/hostenv/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what applying an environment file would change
    Plan(PlanArgs),

    /// Create or update an environment to match its file
    Apply(ApplyArgs),

    /// Show the stored state of an environment
    Show(ShowArgs),

    /// Delete an environment
    Destroy(DestroyArgs),

    /// List which fields can be updated in place
    Fields {
        /// Entity type
        #[arg(short, long, value_enum, default_value = "environment")]
        kind: EntityKind,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Environment file (TOML)
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Environment file (TOML)
    pub file: PathBuf,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Environment name
    pub name: String,

    /// Read the environment from the control plane first
    #[arg(short, long)]
    pub refresh: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Environment name
    pub name: String,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}
