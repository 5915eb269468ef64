//! # Ledger Configuration
//!
//! Settings are read from a single YAML file. Every field is optional.
//!
//! ```yaml
//! locale: "pt-BR"            # or "en-US"; controls section labels
//! utc_offset_minutes: -180   # omit to use the system timezone
//! data_directory: "./data"   # where JsonFileSource looks for <owner>.json
//! default_owner: "user-123"
//! ```
//!
//! The file path comes from the caller or the `LEDGER_CONFIG` environment
//! variable. A missing file means defaults.

use crate::backend::domain::DeviceZone;
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::Locale;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "LEDGER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub locale: Locale,
    /// Device offset east of UTC in minutes; None uses the system timezone
    pub utc_offset_minutes: Option<i32>,
    pub data_directory: Option<PathBuf>,
    pub default_owner: Option<String>,
}

impl LedgerConfig {
    /// Load configuration from a YAML file, falling back to defaults when it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Load from an explicit path, else from `LEDGER_CONFIG`, else defaults
    pub fn load_from_env_or(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(path) => Self::load(PathBuf::from(path)),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        // Validate eagerly so a bad offset fails at startup, not on first use
        config.device_zone()?;
        Ok(config)
    }

    pub fn device_zone(&self) -> Result<DeviceZone> {
        match self.utc_offset_minutes {
            None => Ok(DeviceZone::System),
            Some(minutes) => DeviceZone::from_offset_minutes(minutes)
                .ok_or_else(|| anyhow!("utc_offset_minutes {} is out of range", minutes)),
        }
    }
}
