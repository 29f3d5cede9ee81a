//! Configuration for the goal ledger.

use std::path::{Path, PathBuf};

use goal_store::Principal;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Configuration for a ledger instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Instance ID, attached to log lines
    pub ledger_id: String,
    /// Store configuration
    pub store: StoreConfig,
    /// Channel sizing
    pub channels: ChannelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_id: uuid::Uuid::new_v4().to_string(),
            store: StoreConfig::default(),
            channels: ChannelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Create a new config with ledger ID.
    pub fn new(ledger_id: impl Into<String>) -> Self {
        Self {
            ledger_id: ledger_id.into(),
            ..Default::default()
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        self.contract()?;
        if self.channels.command_buffer == 0 {
            return Err(LedgerError::Config(
                "channels.command_buffer must be at least 1".to_string(),
            ));
        }
        if self.channels.event_buffer == 0 {
            return Err(LedgerError::Config(
                "channels.event_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The store identity as a principal.
    pub fn contract(&self) -> Result<Principal, LedgerError> {
        Principal::new(&self.store.contract_address)
            .map_err(|e| LedgerError::Config(format!("store.contract_address: {e}")))
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Identity the oracle grants "self" decryption rights to
    pub contract_address: String,
    /// Where to load and save the JSON snapshot, if anywhere
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x00000000000000000000000000000000000060a1".to_string(),
            snapshot_path: None,
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Pending commands before callers wait
    pub command_buffer: usize,
    /// Events retained for slow subscribers
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
            event_buffer: 1024,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
