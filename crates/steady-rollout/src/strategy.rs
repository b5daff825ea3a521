//! Rolling replacement options.

use std::time::Duration;

use steady_core::SteadyConfig;
use steady_core::config::{DEFAULT_BATCHES, DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_PRECHECK_TIMEOUT_SECS};
use steady_poll::PollSettings;

/// What to replace and how carefully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Number of batches to split the fleet into.
    pub batches: u32,
    /// Instances already on this AMI are left alone.
    pub target_ami: Option<String>,
    /// Allow a single batch to take the whole fleet down.
    pub force: bool,
    /// Budget for each batch to drain, and for the cluster to settle after it.
    pub drain_timeout: Duration,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            batches: DEFAULT_BATCHES,
            target_ami: None,
            force: false,
            drain_timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS),
        }
    }
}

/// Loop settings for the replacer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSettings {
    /// Interval for the drain loop and the steady-state gates.
    pub poll: PollSettings,
    /// Budget for the steady-state check before the first batch.
    pub precheck_timeout: Duration,
}

impl Default for ReplaceSettings {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            precheck_timeout: Duration::from_secs(DEFAULT_PRECHECK_TIMEOUT_SECS),
        }
    }
}

impl ReplaceSettings {
    pub fn from_config(config: &SteadyConfig) -> Self {
        Self {
            poll: PollSettings::from_config(config),
            precheck_timeout: config.precheck_timeout(),
        }
    }
}
