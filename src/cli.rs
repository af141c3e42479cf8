use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sshcm")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative SSH server configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the facts gathered from this host
    Facts {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile the catalog and list its resources and edges
    Compile(CompileArgs),

    /// Print the managed file contents
    Render(RenderArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Converge this host to the compiled catalog
    Apply(ApplyArgs),

    /// Show the outcome of the last apply
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared inputs
// ============================================================================

/// Where parameters come from
#[derive(Args, Debug, Clone, Default)]
pub struct Inputs {
    /// Directory holding site.toml and nodes/<node>.toml
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Extra parameter file, above the site and node layers
    #[arg(short, long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Override a parameter (repeatable), e.g. --set port=2222
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Node name for the node layer (default: this host's short name)
    #[arg(long)]
    pub node: Option<String>,

    /// Prefix every managed path with this directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// LDAP export to read allowed users from (overrides ldapuser_source)
    #[arg(long, value_name = "FILE")]
    pub ldap_export: Option<PathBuf>,
}

// ============================================================================
// Command arguments
// ============================================================================

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Print the manifest as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the resolved parameters and the layer each came from
    #[arg(long)]
    pub show_params: bool,
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Only this file (e.g. /etc/ssh/sshd_config)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Only resources of this kind, identity or title fragment
    #[arg(short, long)]
    pub target: Option<String>,

    /// Seconds allowed for each state query
    #[arg(long, default_value = "300", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Only resources of this kind, identity or title fragment (plus what they require)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without changing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Resources converged concurrently
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,

    /// Seconds allowed for each query, apply or refresh step
    #[arg(long, default_value = "300", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Exit 2 when changes were made, 0 when none, 1 on failure
    #[arg(long)]
    pub detailed_exitcodes: bool,

    /// Do not record the run in the state directory
    #[arg(long)]
    pub no_state: bool,
}
