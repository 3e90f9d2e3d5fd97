//! commcheck settings
//!
//! Loaded from `commcheck.toml` (or the file given with `--config`) with
//! `COMMCHECK_` environment variables on top, e.g.
//! `COMMCHECK_LOGGING__LEVEL=debug`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use common::config_loader::load_config_or_default;
use common::logging::LogConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "COMMCHECK_";
pub const DEFAULT_CONFIG_FILE: &str = "commcheck.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommcheckConfig {
    pub logging: LogConfig,
    /// Also report CANopen devices sharing a node ID with each other
    pub check_device_to_device: bool,
    /// Seed for `hash` when none is given on the command line
    pub hash_seed: u32,
}

impl Default for CommcheckConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig {
                service_name: "commcheck".to_string(),
                level: "warn".to_string(),
                ..LogConfig::default()
            },
            check_device_to_device: true,
            hash_seed: 0xFFFF_FFFF,
        }
    }
}

impl CommcheckConfig {
    /// Explicit file, else `./commcheck.toml` when present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        let path = match explicit {
            Some(path) => Some(path),
            None if fallback.exists() => Some(fallback.as_path()),
            None => None,
        };
        load_config_or_default(path, ENV_PREFIX).with_context(|| match path {
            Some(path) => format!("Failed to load {}", path.display()),
            None => "Failed to load commcheck settings".to_string(),
        })
    }
}
