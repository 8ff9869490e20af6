mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use wheelhouse_lib::consts::CONFIG_FILENAME;

use crate::cmd::{cmd_build, cmd_info, cmd_inventory, cmd_lock, cmd_partition};
use crate::output::{OutputFormat, Status, headline};

/// wheelhouse - build a requirements manifest into a reproducible wheel directory
#[derive(Parser)]
#[command(name = "wheelhouse")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Provision the environment, build every bucket, and write the lock file
  Build {
    /// Path to the build configuration
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Do not write frozen.txt and sizes.json
    #[arg(long)]
    skip_inventory: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Write the bucket requirement files without building
  Partition {
    /// Path to the build configuration
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Directory for the bucket files (default: <work_dir>/<triple>-<variant>/buckets)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Regenerate and verify the lock file from already built wheels
  Lock {
    /// Path to the build configuration
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Write frozen.txt and sizes.json for the wheel directory
  Inventory {
    /// Path to the build configuration
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the detected build target
  Info {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli.command) {
    headline(Status::Failed, format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(command: Commands) -> Result<()> {
  match command {
    Commands::Build {
      config,
      skip_inventory,
      output,
    } => cmd_build(&config, skip_inventory, output),
    Commands::Partition { config, out, output } => cmd_partition(&config, out.as_deref(), output),
    Commands::Lock { config, output } => cmd_lock(&config, output),
    Commands::Inventory { config, output } => cmd_inventory(&config, output),
    Commands::Info { output } => cmd_info(output),
  }
}
