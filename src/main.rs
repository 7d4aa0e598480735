mod cli;
mod commands;
mod output;

use clap::Parser as ClapParser;
use cli::{Cli, Commands};
use commands::PlanMode;
use output::{CliOutput, UserOutput};
use service_graph::{Error as FedError, Parser};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(fed_error) = e.downcast_ref::<FedError>() {
            // Interrupted by the user: no hint, conventional SIGINT exit code
            if fed_error.is_cancelled() {
                eprintln!("Error: {}", fed_error);
                std::process::exit(130);
            }

            eprintln!("Error: {}", fed_error);
            if let Some(suggestion) = fed_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let parser = Parser::new();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => parser.find_config_file()?,
    };
    let mut config = parser.load_config(&config_path)?;
    if !cli.profile.is_empty() {
        config = config.with_profiles(&cli.profile);
    }

    let ctx = CancellationToken::new();
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, finishing in-flight services");
            signal_ctx.cancel();
        }
    });

    let out = CliOutput;
    let mode = match cli.command {
        Commands::Check => return commands::run_check(&config, &out),
        Commands::Up => PlanMode::Up,
        Commands::Down => PlanMode::Down,
        Commands::Restart { services } => PlanMode::Restart(services),
    };

    if let Err(e) = commands::run_plan(&config, mode, cli.parallel, &ctx, &out).await {
        out.error("Plan incomplete");
        return Err(e);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
