use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adscript")]
#[command(about = "Generate, evaluate and refine ad scripts from a campaign brief")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Workflow config file (defaults to the built-in workflow.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the primary graph for a brief, optionally followed by an A/B variation
    Generate(GenerateArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Campaign brief (.yaml, .yml or .json)
    #[arg(long)]
    pub brief: PathBuf,

    /// Also produce one A/B variation of the final script
    #[arg(long)]
    pub variation: bool,

    /// Write the run report as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the run's event log (defaults to ~/.ad-script-agent/runs)
    #[arg(long)]
    pub events_dir: Option<PathBuf>,
}
