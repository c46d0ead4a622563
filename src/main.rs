use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use settings::{ConfigOrigin, Settings};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod daemon;
mod settings;
mod sources;
mod store;
mod watcher;

#[derive(Parser)]
#[command(name = "update-coordinator")]
#[command(author, version, about = "Periodic data refresh with single-flight loading")]
struct Cli {
    /// Path to the config file (default: ~/.config/update-coordinator/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the refresh daemon
    Run,

    /// Load once from the configured source
    Fetch {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and print the effective configuration
    CheckConfig,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let path = Settings::resolve_path(cli.config)?;
    let (settings, origin) = Settings::load_with_origin(&path)?;
    init_logging(settings.debug, cli.json_logs);
    match origin {
        ConfigOrigin::File => tracing::info!(?path, "Loaded config"),
        ConfigOrigin::Defaults => {
            tracing::info!(?path, "Config file not found, using defaults")
        }
    }

    match cli.command {
        Commands::Run => daemon::run(path, settings).await,
        Commands::Fetch { json } => cli::fetch::run(&settings, json).await,
        Commands::CheckConfig => cli::check_config::run(&path, &settings),
        Commands::Completions { .. } => Ok(()),
    }
}
