//! Trowel CLI - static site asset pipeline with live reload.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "trowel")]
#[command(about = "Compile, optimise and preview a static site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to trowel.toml config file
    #[arg(short, long, default_value = "trowel.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile sources, serve them and rebuild on change
    Dev {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build the distribution directory
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep existing images in the output and skip image processing
        #[arg(long)]
        no_images: bool,
    },

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Directory to serve (defaults to the configured output)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let project = config::load(&cli.config)?;

    match cli.command {
        Commands::Dev { port, no_open } => {
            commands::dev::run(&project, port, !no_open).await?;
        }
        Commands::Build { output, no_images } => {
            commands::build::run(&project, output, !no_images).await?;
        }
        Commands::Serve { port, dir, no_open } => {
            let dir = dir.unwrap_or_else(|| project.pipeline().dist_dir);
            commands::serve::run(&project.file.server, port, dir, !no_open).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_without_images() {
        let cli = Cli::try_parse_from(["trowel", "build", "--no-images"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("trowel.toml"));
        assert!(matches!(
            cli.command,
            Commands::Build {
                no_images: true,
                output: None
            }
        ));
    }

    #[test]
    fn parses_dev_port() {
        let cli = Cli::try_parse_from(["trowel", "-v", "dev", "--port", "8080"]).unwrap();

        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Dev { port: Some(8080), no_open: false }));
    }
}
