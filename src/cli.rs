use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "conclave-site")]
#[command(about = "Backend for The Conclave community website", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the YAML config file; falls back to `CONFIG_PATH`, then `config.yaml`
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run migrations, then serve the HTTP API (default)
    Serve,
    /// Apply the database schema and exit
    Migrate,
    /// Parse and validate the config file, then exit
    CheckConfig,
}

impl Cli {
    pub fn action(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["conclave-site", "--config", "site.yaml"]).expect("parse");
        assert_eq!(cli.action(), Command::Serve);
        assert_eq!(cli.config, Some(PathBuf::from("site.yaml")));
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["conclave-site", "check-config"]).expect("parse");
        assert_eq!(cli.action(), Command::CheckConfig);
        assert!(cli.config.is_none());
        let cli = Cli::try_parse_from(["conclave-site", "migrate"]).expect("parse");
        assert_eq!(cli.action(), Command::Migrate);
    }
}
