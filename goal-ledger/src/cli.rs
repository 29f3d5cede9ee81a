//! Command-line interface for `goalctl`.
//!
//! Every option has a `GOAL_LEDGER_*` environment fallback. Options given on
//! the command line override the YAML config file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::LedgerConfig;
use crate::ledger::LedgerError;

/// goalctl - encrypted goal ledger tooling
#[derive(Parser, Debug, Clone)]
#[command(name = "goalctl")]
#[command(about = "Seal goal descriptions and exercise the encrypted goal ledger")]
pub struct Args {
    /// YAML config file
    #[arg(long, env = "GOAL_LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GOAL_LEDGER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, env = "GOAL_LEDGER_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Encrypt a goal description for an owner
    Encrypt {
        /// Owner identifier the key is derived from
        #[arg(short, long)]
        owner: String,
        /// Plaintext description
        plaintext: String,
    },

    /// Decrypt a description blob
    Decrypt {
        /// Owner identifier the key is derived from
        #[arg(short, long)]
        owner: String,
        /// Hex blob, with or without 0x
        blob: String,
    },

    /// Print the fingerprint of an owner's description key
    DeriveKey {
        /// Owner identifier
        owner: String,
    },

    /// Run a goal lifecycle against the mock oracle and print its events
    Demo {
        /// Snapshot file to load from and save to
        #[arg(long, env = "GOAL_LEDGER_SNAPSHOT")]
        snapshot: Option<PathBuf>,
    },
}

impl Args {
    /// Build the effective config: file (or defaults) plus CLI overrides.
    pub fn resolve_config(&self) -> Result<LedgerConfig, LedgerError> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path)?,
            None => LedgerConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }
        if let Commands::Demo {
            snapshot: Some(path),
        } = &self.command
        {
            config.store.snapshot_path = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encrypt() {
        let args = Args::try_parse_from(["goalctl", "encrypt", "--owner", "0xA11CE", "hello"]).unwrap();
        match args.command {
            Commands::Encrypt { owner, plaintext } => {
                assert_eq!(owner, "0xA11CE");
                assert_eq!(plaintext, "hello");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::try_parse_from([
            "goalctl",
            "--log-level",
            "debug",
            "--log-json",
            "demo",
            "--snapshot",
            "/tmp/goals.json",
        ])
        .unwrap();

        let config = args.resolve_config().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(
            config.store.snapshot_path,
            Some(PathBuf::from("/tmp/goals.json"))
        );
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.yaml");
        std::fs::write(&path, "ledger_id: from-file\nlogging:\n  level: warn\n").unwrap();

        let args = Args::try_parse_from([
            "goalctl",
            "--config",
            path.to_str().unwrap(),
            "derive-key",
            "0xabc",
        ])
        .unwrap();

        let config = args.resolve_config().unwrap();
        assert_eq!(config.ledger_id, "from-file");
        assert_eq!(config.logging.level, "warn");
    }
}
