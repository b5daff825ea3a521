//! steady.toml configuration parser.
//!
//! Every field is optional. Accessors resolve the effective value with the
//! built-in default; command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "steady.toml";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_SERVICE_CHECK_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_STALE_SECS: u64 = 120;
pub const DEFAULT_BATCHES: u32 = 3;
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 1200;
pub const DEFAULT_PRECHECK_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteadyConfig {
    pub poll: Option<PollConfig>,
    pub service_check: Option<ServiceCheckConfig>,
    pub rolling_replace: Option<RollingReplaceConfig>,
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheckConfig {
    pub timeout_secs: Option<u64>,
    pub stale_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingReplaceConfig {
    pub batches: Option<u32>,
    pub drain_timeout_secs: Option<u64>,
    pub precheck_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    /// Override for local emulators.
    pub endpoint_url: Option<String>,
}

impl SteadyConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` if given, else `steady.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };
        let config = Self::from_file(path)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        let secs = self
            .poll
            .as_ref()
            .and_then(|p| p.interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    pub fn service_check_timeout(&self) -> Duration {
        let secs = self
            .service_check
            .as_ref()
            .and_then(|s| s.timeout_secs)
            .unwrap_or(DEFAULT_SERVICE_CHECK_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn stale_after(&self) -> Duration {
        let secs = self
            .service_check
            .as_ref()
            .and_then(|s| s.stale_secs)
            .unwrap_or(DEFAULT_STALE_SECS);
        Duration::from_secs(secs)
    }

    pub fn batches(&self) -> u32 {
        self.rolling_replace
            .as_ref()
            .and_then(|r| r.batches)
            .unwrap_or(DEFAULT_BATCHES)
    }

    pub fn drain_timeout(&self) -> Duration {
        let secs = self
            .rolling_replace
            .as_ref()
            .and_then(|r| r.drain_timeout_secs)
            .unwrap_or(DEFAULT_DRAIN_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn precheck_timeout(&self) -> Duration {
        let secs = self
            .rolling_replace
            .as_ref()
            .and_then(|r| r.precheck_timeout_secs)
            .unwrap_or(DEFAULT_PRECHECK_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn region(&self) -> Option<&str> {
        self.aws.as_ref().and_then(|a| a.region.as_deref())
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.aws.as_ref().and_then(|a| a.endpoint_url.as_deref())
    }
}
