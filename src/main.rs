use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ctry::core::log::init_logging;
use std::net::SocketAddr;

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

impl From<Commands> for ctry::AppCommand {
    fn from(cmd: Commands) -> ctry::AppCommand {
        match cmd {
            Commands::Serve { listen } => ctry::AppCommand::Serve { listen },
            Commands::Refresh => ctry::AppCommand::Refresh,
            Commands::List {
                region,
                currency,
                sort,
            } => ctry::AppCommand::List {
                region,
                currency,
                sort,
            },
            Commands::Status => ctry::AppCommand::Status,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP service
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Fetch countries and exchange rates, then rebuild the summary image
    Refresh,
    /// List stored countries
    List {
        /// Only countries in this region
        #[arg(long)]
        region: Option<String>,
        /// Only countries using this currency code
        #[arg(long)]
        currency: Option<String>,
        /// Sort order, e.g. `name_desc` or `gdp_desc`
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show the number of stored countries and the last refresh time
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ctry::cli::setup::setup(),
        Some(cmd) => ctry::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
