//! The `captool config` command: inspect and initialize settings.

use std::path::{Path, PathBuf};

use captool_core::Config;
use clap::{Args, Subcommand};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file location
    Path,

    /// Print where the scorer jar, scratch files and embedding caches resolve to
    Paths,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => println!("{}", config.to_toml()?),
        ConfigCommand::Path => println!("{}", Config::default_path().display()),
        ConfigCommand::Paths => {
            for (label, path) in resolved_paths(&config) {
                let marker = if path.exists() { "" } else { "  (missing)" };
                println!("{label:<16} {}{marker}", path.display());
            }
        }
        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            write_default(&path, force)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }
    Ok(())
}

/// Locations the scorer and the embedding loader will actually use.
fn resolved_paths(config: &Config) -> Vec<(&'static str, PathBuf)> {
    vec![
        ("spice install", config.spice.install_dir()),
        ("spice jar", config.spice.jar_path()),
        ("spice temp", config.spice.temp_dir()),
        ("spice cache", config.spice.cache_root()),
        ("embedding cache", config.embedding_output_dir()),
    ]
}

/// Write the default config to `path`, refusing to clobber unless `force`.
fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    tracing::info!("Config file created at: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_default_round_trips_and_guards_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default(&path, false).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.spice.jar, Config::default().spice.jar);

        let err = write_default(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        write_default(&path, true).unwrap();
    }

    #[test]
    fn test_resolved_paths_follow_install_dir() {
        let mut config = Config::default();
        config.spice.install_dir = PathBuf::from("/opt/spice");

        let paths = resolved_paths(&config);
        let get = |label: &str| paths.iter().find(|(l, _)| *l == label).unwrap().1.clone();

        assert_eq!(get("spice jar"), PathBuf::from("/opt/spice/spice-1.0.jar"));
        assert_eq!(get("spice temp"), PathBuf::from("/opt/spice/tmp"));
        assert_eq!(get("spice cache"), PathBuf::from("/opt/spice/cache"));
    }
}
