//! Cowork CLI - cw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cowork_core::layout::LOCKS_DIR;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmd;
mod diff_utils;
mod system_config;
mod util;

/// Cowork - private workspaces and a shared changelog for configuration trees
#[derive(Parser)]
#[command(name = "cw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Canonical root (default: nearest directory with a .changelog, else cwd)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Acting user (default: config user.name, else $USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the changelog of a canonical root
    Init,
    /// Make sure the private workspace and snapshot exist
    Workspace,
    /// Show workspace, changelog and pending changes
    Status,
    /// Show every commit, newest first
    Log {
        /// Maximum number of commits to show
        #[arg(long)]
        limit: Option<usize>,
        /// Print bundles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show commits that touched one file
    History {
        /// Root-relative, absolute, or private-workspace path
        file: PathBuf,
        /// Print bundles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Diff the canonical version of a file against your copy
    Diff {
        file: PathBuf,
        /// Number of context lines (default: 3)
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
    },
    /// Publish your versions of files and record the commit
    Commit {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Replace your copies of files with the canonical versions
    Sync {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Make sure your snapshot exists, or list all snapshots
    Snapshot {
        #[arg(long)]
        list: bool,
    },
    /// Run the maintenance worker in the foreground until Ctrl-C
    Watch,
    /// View and edit user configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value (e.g. worker.recheck_interval_secs)
    Get { key: String },
    /// Set one value
    Set { key: String, value: String },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

/// Install the global subscriber
///
/// Filter comes from `COWORK_LOG`. When `log_dir` is given, events are also
/// written to a daily-rolling file there.
fn init_logging(default_filter: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env("COWORK_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cowork.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config(config_cmd) = cli.command {
        init_logging("warn", None);
        return match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        };
    }

    let config = system_config::load()?;
    let context = util::resolve_context(cli.root, cli.user, &config)?;

    let _log_guard = match cli.command {
        Commands::Watch => {
            let log_dir = context.root.join(LOCKS_DIR).join("logs");
            std::fs::create_dir_all(&log_dir)?;
            init_logging("info", Some(&log_dir))
        }
        _ => init_logging("warn", None),
    };

    match cli.command {
        Commands::Init => cmd::init::run(&context).await,
        Commands::Workspace => cmd::workspace::run(&context, &config).await,
        Commands::Status => cmd::status::run(&context).await,
        Commands::Log { limit, json } => cmd::log::run(&context, limit, json).await,
        Commands::History { file, json } => cmd::history::run(&context, &file, json).await,
        Commands::Diff { file, context: lines } => cmd::diff::run(&context, &file, lines).await,
        Commands::Commit { paths } => cmd::commit::run(&context, &config, paths).await,
        Commands::Sync { paths } => cmd::sync::run(&context, &paths).await,
        Commands::Snapshot { list } => cmd::snapshot::run(&context, list).await,
        Commands::Watch => cmd::watch::run(&context, &config).await,
        Commands::Config(_) => Ok(()),
    }
}
