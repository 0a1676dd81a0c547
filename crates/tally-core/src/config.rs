// NETWORK CONFIGURATION
//
// SAFETY INVARIANTS:
// 1. Every node on a network runs with identical values; changing any of them
//    is a network split
// 2. Values are fixed for the process lifetime and passed explicitly to every
//    clock and validator call, never read from globals

use crate::amount::Amount;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 2019-02-14T10:00:00Z
pub const GENESIS_UNIX_SECONDS: i64 = 1_550_138_400;
pub const EPOCH_LENGTH_SECONDS: u64 = 600;
pub const EPOCH_CLOSING_SECONDS: u64 = 10;
pub const PROPAGATION_WINDOW_SECONDS: u64 = 10;
pub const EPOCH_HASH_PUSH_WINDOW_SECONDS: u64 = 20;
/// 0.01 in base units
pub const MIN_FEE_BASE_UNITS: i64 = 1_000_000;
pub const DEFAULT_DECIMALS: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Network-wide constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Start of epoch 0
    pub genesis: DateTime<Utc>,

    pub epoch_length_seconds: u64,

    /// Tail of each epoch in which no transaction may be timestamped
    pub epoch_closing_seconds: u64,

    /// Allowed distance between an object's timestamp and the receiver's clock
    pub propagation_window_seconds: u64,

    /// How long after an epoch starts its hash push is accepted
    pub push_window_seconds: u64,

    pub min_fee: Amount,

    /// Maximum fractional digits accepted in amounts
    pub decimals: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            genesis: Utc
                .timestamp_opt(GENESIS_UNIX_SECONDS, 0)
                .single()
                .unwrap_or_default(),
            epoch_length_seconds: EPOCH_LENGTH_SECONDS,
            epoch_closing_seconds: EPOCH_CLOSING_SECONDS,
            propagation_window_seconds: PROPAGATION_WINDOW_SECONDS,
            push_window_seconds: EPOCH_HASH_PUSH_WINDOW_SECONDS,
            min_fee: Amount::from_base_units(MIN_FEE_BASE_UNITS),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl NetworkConfig {
    /// Parse YAML; keys that are absent keep their network defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: NetworkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&raw)?;
        log::info!(
            "Loaded network config from {} (genesis {}, epoch {}s)",
            path.as_ref().display(),
            config.genesis.to_rfc3339(),
            config.epoch_length_seconds
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epoch_length_seconds == 0 {
            return Err(ConfigError::Invalid("epoch_length_seconds must be > 0".to_string()));
        }
        if self.epoch_closing_seconds >= self.epoch_length_seconds {
            return Err(ConfigError::Invalid(
                "epoch_closing_seconds must be shorter than the epoch".to_string(),
            ));
        }
        if self.decimals == 0 {
            return Err(ConfigError::Invalid("decimals must be > 0".to_string()));
        }
        if self.min_fee.exceeds_precision(self.decimals) {
            return Err(ConfigError::Invalid(format!(
                "min_fee has more than {} decimal places",
                self.decimals
            )));
        }
        Ok(())
    }
}
