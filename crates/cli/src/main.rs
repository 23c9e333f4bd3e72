//! Hookhost CLI - Command-line interface for the hookhost plugin runtime.

mod commands;
mod discovery;
mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use hookhost_core::HostConfig;
use miette::Result;
use tracing::debug;

use commands::Context;

#[derive(Parser)]
#[command(name = "hookhost")]
#[command(
    author,
    version,
    about = "Discover, validate and order plugins bound to named hooks"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to hookhost.json (auto-detected if not specified)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plugins found under a plugins directory
    List {
        /// Plugins directory (configured directory if not specified)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Validate a single plugin directory
    Validate {
        /// Directory holding the plugin descriptor
        plugin_dir: PathBuf,
    },

    /// Show the invocation order derived from a bindings file
    Order {
        /// JSON array of hook bindings
        bindings_file: PathBuf,

        /// Only show this hook
        #[arg(long, value_name = "NAME")]
        hook: Option<String>,
    },

    /// Load and start every plugin, then stop them again
    Start {
        /// Plugins directory (configured directory if not specified)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Give up starting plugins after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, config_path) = load_config(cli.config.as_deref())?;
    logging::init(cli.verbose, &config.log_level);
    match &config_path {
        Some(path) => debug!(path = %path.display(), "Using host config"),
        None => debug!("No host config found, using defaults"),
    }

    let messages = config.messages()?;
    let ctx = Context::new(config, messages);

    match cli.command {
        Commands::List { root, detailed } => {
            let root = ctx.plugins_root(root.as_deref());
            commands::list::execute(&ctx, &root, detailed)
        }

        Commands::Validate { plugin_dir } => commands::validate::execute(&ctx, &plugin_dir),

        Commands::Order {
            bindings_file,
            hook,
        } => commands::order::execute(&ctx, &bindings_file, hook.as_deref()),

        Commands::Start { root, timeout } => {
            let root = ctx.plugins_root(root.as_deref());
            commands::start::execute(&ctx, &root, timeout.map(Duration::from_secs))
        }
    }
}

/// Loads the explicit config file, else the discovered one, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<(HostConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discovery::find_config()?,
    };

    match path {
        Some(path) => {
            let config = HostConfig::from_file(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((HostConfig::default(), None)),
    }
}
