//! Vault Configuration
//!
//! Settings come from `config/default`, `config/local`, an optional explicit
//! file and `QUORUMVAULT__`-prefixed environment variables, later sources
//! winning.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use quorumvault_core::{EngineOptions, QuorumConfig, DEFAULT_EVENT_CAPACITY};
use quorumvault_types::{Address, Result};

/// Vault settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Owner set and threshold
    #[serde(default)]
    pub quorum: QuorumSettings,

    /// Event bus configuration
    #[serde(default)]
    pub events: EventSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Owner set and threshold, as written by the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumSettings {
    /// Owner addresses, `0x`-prefixed hex
    #[serde(default)]
    pub owners: Vec<String>,

    /// Confirmations required to execute
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for QuorumSettings {
    fn default() -> Self {
        Self {
            owners: Vec::new(),
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Events buffered per subscriber
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_threshold() -> usize {
    1
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl VaultSettings {
    /// Load settings from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::load_layered(config_path.map(Path::new), Path::new("config"))
    }

    /// Merge `<config_dir>/default`, `<config_dir>/local`, the explicit file
    /// and the environment, later sources winning
    pub fn load_layered(config_path: Option<&Path>, config_dir: &Path) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from(config_dir.join("default")).required(false))
            .add_source(config::File::from(config_dir.join("local")).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // QUORUMVAULT__QUORUM__OWNERS=0xabc...,0xdef...
        builder = builder.add_source(
            config::Environment::with_prefix("QUORUMVAULT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("quorum.owners"),
        );

        let settings = builder
            .build()
            .context("failed to read vault settings")?
            .try_deserialize()
            .context("invalid vault settings")?;

        Ok(settings)
    }

    /// Parse owner addresses and validate them against the threshold
    pub fn quorum_config(&self) -> Result<QuorumConfig> {
        let owners = self
            .quorum
            .owners
            .iter()
            .map(|owner| Address::parse(owner))
            .collect::<Result<Vec<_>>>()?;
        QuorumConfig::new(owners, self.quorum.threshold)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            event_capacity: self.events.capacity,
        }
    }
}
