//! CLI module for keypool
//!
//! - `serve`: HTTP API plus the background scheduler (default)
//! - `issue`, `sweep`, `list`, `check`: one-shot operations against the configured store

pub mod keys;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// keypool - rotating pool of self-expiring access keys
#[derive(Parser)]
#[command(name = "keypool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API and key scheduler (default)
    Serve,

    /// Issue one batch of keys now
    Issue(keys::IssueArgs),

    /// Delete expired keys now
    Sweep,

    /// Print stored keys
    List(keys::ListArgs),

    /// Check whether a key is currently valid
    Check(keys::CheckArgs),
}

/// Load `.env` and configuration, then install logging.
///
/// A configuration that fails to load falls back to defaults with a warning;
/// one that loads but fails validation is an error.
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    logging::init_logging(&(&config.logging).into());

    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["keypool"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_issue_count() {
        let cli = Cli::try_parse_from(["keypool", "issue", "--count", "5"]).unwrap();
        match cli.command {
            Some(Command::Issue(args)) => {
                assert_eq!(args.count.map(std::num::NonZeroUsize::get), Some(5))
            }
            _ => panic!("Expected issue command"),
        }

        let cli = Cli::try_parse_from(["keypool", "issue"]).unwrap();
        match cli.command {
            Some(Command::Issue(args)) => assert_eq!(args.count, None),
            _ => panic!("Expected issue command"),
        }
    }

    #[test]
    fn test_parse_list_and_check() {
        let cli = Cli::try_parse_from(["keypool", "list", "--valid"]).unwrap();
        assert!(matches!(cli.command, Some(Command::List(args)) if args.valid));

        let cli = Cli::try_parse_from(["keypool", "check", "B-Team_123456"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Check(args)) if args.key == "B-Team_123456"));

        assert!(Cli::try_parse_from(["keypool", "check"]).is_err());
        assert!(Cli::try_parse_from(["keypool", "issue", "--count", "0"]).is_err());
    }
}
