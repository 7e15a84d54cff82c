use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use locus_cli::{
    commands::{
        status as status_cmd,
        track::{self as track_cmd, TrackArgs},
    },
    config::{DEFAULT_CONFIG_PATH, Overrides, load_config, load_config_or_default, resolve_settings},
};
use locus_core::StrategySelector;

const DEFAULT_LOG_FILTER: &str = "locus=info";

#[derive(Debug, Parser)]
#[command(name = "locus-cli", about = "Location acquisition with automatic fallback", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", env = "LOCUS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the persisted orchestrator state
    #[arg(long, env = "LOCUS_STORE_DIR", value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Seconds after which a cached position is considered stale
    #[arg(long, value_name = "SECS")]
    staleness_secs: Option<u64>,

    /// Seconds to wait for a resolution before giving up (0 waits forever)
    #[arg(long, value_name = "SECS")]
    resolution_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Acquire positions from a replay track
    Track(TrackCommand),

    /// Show the persisted state and last position
    Status(StatusCommand),
}

#[derive(Debug, Args)]
struct TrackCommand {
    /// Which strategy to start with: auto, primary or fallback
    #[arg(short, long, default_value = "auto")]
    strategy: StrategySelector,

    /// Replay track describing what each strategy reports
    #[arg(short, long, value_name = "FILE")]
    track: PathBuf,

    /// Stop after this many updated fixes
    #[arg(short, long, value_name = "N")]
    updates: Option<u32>,

    /// Decline every resolution instead of asking
    #[arg(long)]
    non_interactive: bool,
}

#[derive(Debug, Args)]
struct StatusCommand {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // An explicit --config must exist; the default path is optional.
    let loaded = match &cli.config {
        Some(path) => load_config(path),
        None => load_config_or_default(DEFAULT_CONFIG_PATH),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    let settings = resolve_settings(
        &config,
        Overrides {
            staleness_secs: cli.staleness_secs,
            resolution_timeout_secs: cli.resolution_timeout_secs,
            store_dir: cli.store_dir,
        },
    )?;

    match cli.command {
        Commands::Track(args) => {
            let (summary, _) = track_cmd::track(
                &settings,
                TrackArgs {
                    selector: args.strategy,
                    track: args.track,
                    updates: args.updates,
                    interactive: !args.non_interactive,
                },
            )
            .await?;
            println!("final state: {}", summary.state);
        }
        Commands::Status(args) => {
            let output = status_cmd::status(&settings.store_dir).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&output.to_json())?);
            } else {
                println!("{output}");
            }
        }
    }

    Ok(())
}
