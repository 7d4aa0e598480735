use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fed-order")]
#[command(about = "Show the order in which services would be brought up, torn down, or restarted")]
pub struct Cli {
    /// Config file path (defaults to service-federation.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Active profiles for conditional service selection (can be repeated)
    #[arg(short, long)]
    pub profile: Vec<String>,

    /// Visit at most this many services at once
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate dependencies and print the graph
    Check,
    /// Plan bringing every service up (dependencies first)
    Up,
    /// Plan tearing every service down (dependents first)
    Down,
    /// Plan restarting services and everything that depends on them
    Restart {
        /// Services that changed
        #[arg(required = true)]
        services: Vec<String>,
    },
}
