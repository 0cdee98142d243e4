use anyhow::Result;
use budget_proxy::core::log::init_logging;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the budget server and serve the API (default)
    Serve,
    /// Create default configuration
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => budget_proxy::run(cli.config_path.as_deref()).await,
        Commands::Setup => budget_proxy::cli::setup::setup(cli.config_path.as_deref()),
    };

    if let Err(e) = &result {
        tracing::error!("Application failed: {e:#}");
    }
    result
}
