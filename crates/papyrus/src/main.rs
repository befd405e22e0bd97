//! Papyrus CLI - build, lint and edit a documentation site.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod process;

use commands::build::BuildOptions;
use config::Project;

#[derive(Parser)]
#[command(name = "papyrus")]
#[command(about = "Build, lint and edit a papyrus documentation site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to papyrus.toml config file
    #[arg(short, long, default_value = "papyrus.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the documentation site
    Build {
        /// Output directory (defaults to config or "build")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip CSS minification
        #[arg(long)]
        no_minify: bool,

        /// Attach the template debug toolbar to every page
        #[arg(long)]
        debug_toolbar: bool,

        /// Number of pages rendered in parallel
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Run linters
    Lint,

    /// Run auto-formatters
    Format,

    /// Open the project in the configured editor
    Edit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let project = Project::load(&cli.config)?;

    match cli.command {
        Commands::Build {
            output,
            no_minify,
            debug_toolbar,
            jobs,
        } => {
            let options = BuildOptions {
                output,
                minify: if no_minify { Some(false) } else { None },
                debug_toolbar,
                jobs,
            };
            commands::build::run(&project, options).await?;
        }
        Commands::Lint => {
            commands::lint::run(&project).await?;
        }
        Commands::Format => {
            commands::format::run(&project).await?;
        }
        Commands::Edit => {
            commands::edit::run(&project).await?;
        }
    }

    Ok(())
}
