//! quire - documentation pipeline for C/C++ libraries

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

/// Environment variable holding the log filter
const LOG_ENV: &str = "QUIRE_LOG";

#[derive(Parser)]
#[command(name = "quire")]
#[command(version = quire::VERSION)]
#[command(about = "Render C/C++ header documentation as an HTML site", long_about = None)]
struct Cli {
    /// Source directory holding quire.toml and the narrative documents
    #[arg(short = 'C', long = "directory", global = true, default_value = ".")]
    directory: PathBuf,

    /// Configuration file (defaults to <directory>/quire.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: extract, translate, render
    Build {
        /// Treat warnings as errors
        #[arg(short = 'W', long = "warnings-as-errors")]
        warnings_as_errors: bool,
    },

    /// Scan the headers and write the intermediate symbol file
    Extract,

    /// Print the extracted symbol tree
    Tree,

    /// Validate the configuration, theme and assets without building
    Check,

    /// Remove the build directory and the generated API pages
    Clean,
}

fn init_logging(verbose: bool, color: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let ctx = commands::Context::load(&cli.directory, cli.config.as_deref(), !cli.no_color)?;
    match cli.command {
        Commands::Build { warnings_as_errors } => commands::build(&ctx, warnings_as_errors),
        Commands::Extract => commands::extract(&ctx),
        Commands::Tree => commands::tree(&ctx),
        Commands::Check => commands::check(&ctx),
        Commands::Clean => commands::clean(&ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let color = !cli.no_color && commands::stderr_is_terminal();
    init_logging(cli.verbose, color);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
