//! Command-line interface and config loading.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cx_domain::config::{Config, ConfigSeverity};

#[derive(Debug, Parser)]
#[command(name = "cx-gateway", about = "Cx gateway and subscriber-data cache")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "cx-gateway.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway (default).
    Serve,
    /// Configuration helpers.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Check the config file and report issues.
    Validate,
    /// Print the effective configuration.
    Show,
}

/// Load the configuration file, falling back to defaults when it does
/// not exist.
pub fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Ok(config)
    } else {
        tracing::info!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

/// Print validation issues. Returns false when any is an error.
pub fn validate(config: &Config, path: &PathBuf) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{}: OK", path.display());
        return true;
    }
    for issue in &issues {
        let tag = match issue.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        println!("{tag}: {issue}");
    }
    !issues
        .iter()
        .any(|issue| issue.severity == ConfigSeverity::Error)
}

/// Print the effective configuration as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => println!("failed to render config: {e}"),
    }
}
