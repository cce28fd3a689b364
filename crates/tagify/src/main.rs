//! Tagify CLI - Tag images with a vision-language model.
//!
//! Tagify sends an image to a vision-language model and prints the tags it
//! comes up with. It stores nothing; results go to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Tag a single image
//! tagify tag photo.jpg
//!
//! # Stamp metadata onto the result
//! tagify tag photo.jpg --name beach --url https://example.com/photo.jpg --owner alice
//!
//! # View configuration
//! tagify config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tagify_core::Config;

mod cli;
mod logging;

/// Tagify - Tag images with a vision-language model.
#[derive(Parser, Debug)]
#[command(name = "tagify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "TAGIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag an image and print the result
    Tag(cli::tag::TagArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        // An explicit config file must load
        Some(path) => Config::load_from(path)?,
        None => match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `tagify config path`."
                );
                Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tagify v{}", tagify_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
