//! captool CLI - SPICE scoring and pretrained embedding loading for captioning.
//!
//! # Usage
//!
//! ```bash
//! # Score a batch of captions with SPICE
//! captool spice batch.json --pretty
//!
//! # Build (or reuse) an embedding table for a word map
//! captool embed glove.6B.300d.txt --word-map WORDMAP_coco.json --name coco
//!
//! # View configuration
//! captool config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// captool - SPICE scoring and pretrained embeddings for image captioning.
#[derive(Parser, Debug)]
#[command(name = "captool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Score candidate captions against references with SPICE
    Spice(cli::spice::SpiceArgs),

    /// Build or load a vocabulary-aligned embedding table
    Embed(cli::embed::EmbedArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match captool_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `captool config path`."
            );
            captool_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("captool v{}", captool_core::VERSION);

    match cli.command {
        Commands::Spice(args) => cli::spice::execute(args, config).await,
        Commands::Embed(args) => cli::embed::execute(args, config),
        Commands::Config(args) => cli::config::execute(args, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_embed_command() {
        let cli = Cli::try_parse_from([
            "captool",
            "embed",
            "glove.txt",
            "--word-map",
            "map.json",
            "--name",
            "coco",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Embed(_)));
    }

    #[test]
    fn test_parse_config_paths() {
        let parsed = Cli::try_parse_from(["captool", "config", "paths"]).unwrap();
        assert!(matches!(
            parsed.command,
            Commands::Config(cli::config::ConfigArgs {
                command: cli::config::ConfigCommand::Paths
            })
        ));
    }

    #[test]
    fn test_spice_requires_input() {
        assert!(Cli::try_parse_from(["captool", "spice"]).is_err());
    }
}
