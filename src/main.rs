mod cli;
mod core;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bwcalc", about = "Monthly bandwidth quota calculator", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/bwcalc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the month from the bandwidth used so far
    Report {
        /// Bandwidth used so far this month, in GB
        #[arg(short, long, allow_hyphen_values = true)]
        used: Option<String>,

        /// Do not write anything back to the settings store
        #[arg(long)]
        no_save: bool,

        /// Do not interpolate days missed since the last run
        #[arg(long)]
        no_fill: bool,
    },
    /// Enter usage values line by line
    Interactive,
    /// Show this month's per-day history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// Lower bound of the chart range, in GB
        #[arg(long, allow_hyphen_values = true)]
        min: Option<String>,

        /// Upper bound of the chart range, in GB
        #[arg(long, allow_hyphen_values = true)]
        max: Option<String>,
    },
    /// Check which settings servers are reachable
    Probe,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Delete the most recent day of history
    DeleteLast,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the config file location
    Path,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "bwcalc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output_opts = cli::output::OutputOptions {
        format: cli::output::OutputFormat::parse(cli.format.as_deref(), cli.json),
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color),
        verbose: cli.verbose,
    };
    let config = cli.config.as_deref();

    match cli.command {
        None => cli::report_cmd::run(config, None, false, false, &output_opts).await?,
        Some(Commands::Report {
            used,
            no_save,
            no_fill,
        }) => cli::report_cmd::run(config, used, no_save, no_fill, &output_opts).await?,
        Some(Commands::Interactive) => cli::interactive_cmd::run(config, &output_opts).await?,
        Some(Commands::History { action, min, max }) => match action {
            Some(HistoryAction::DeleteLast) => {
                cli::history_cmd::delete_last(config, &output_opts).await?
            }
            None => cli::history_cmd::show(config, min, max, &output_opts).await?,
        },
        Some(Commands::Probe) => cli::probe_cmd::run(config, &output_opts).await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(config, &output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(config, &output_opts)?,
            ConfigAction::Path => cli::config_cmd::path(config, &output_opts)?,
        },
    }

    Ok(())
}
