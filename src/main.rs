use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod build;
mod commands;
mod config;
mod util;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: PagewrightCommand,
}

#[derive(Parser)]
struct BuildArgs {
    /// The project directory, defaulting to the current directory
    project: Option<PathBuf>,

    /// Pre-render every page to HTML at build time
    #[arg(long, conflicts_with = "no_prerender")]
    prerender: bool,

    /// Ship empty shells and render pages on the client
    #[arg(long)]
    no_prerender: bool,

    /// Skip copying the public directory
    #[arg(long)]
    no_static_copy: bool,

    /// URL prefix the site is deployed under, e.g. /docs
    #[arg(long)]
    base_path: Option<String>,
}

impl BuildArgs {
    fn prerender_override(&self) -> Option<bool> {
        if self.prerender {
            Some(true)
        } else if self.no_prerender {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Parser)]
struct CleanArgs {
    /// The project directory, defaulting to the current directory
    project: Option<PathBuf>,

    /// Print what would be deleted without deleting it
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum PagewrightCommand {
    /// Build the project into its output directory
    Build(BuildArgs),

    /// Delete the output directory
    Clean(CleanArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        PagewrightCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        PagewrightCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}
