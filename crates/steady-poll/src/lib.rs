//! steady-poll — convergence polling over an eventually-consistent API.
//!
//! Two pollers share one loop shape: sleep a fixed interval, give up once
//! the phase deadline has passed, otherwise re-describe and evaluate.
//! "Not converged yet" is an ordinary [`ServiceStatus::Pending`] value;
//! only a missed deadline or a failed API call is an error.
//!
//! # Components
//!
//! - **`cluster`** — `ClusterStatePoller`: every listed service stable and healthy
//! - **`deployment`** — `DeploymentPoller`: one service's primary deployment rolled out
//! - **`status`** — per-iteration evaluation (`ServiceStatus`, `PendingReason`)
//! - **`events`** — recent-event dump attached to timeouts

pub mod cluster;
pub mod deployment;
pub mod error;
pub mod events;
pub mod status;

use std::time::Duration;

use steady_core::SteadyConfig;
use steady_core::config::DEFAULT_POLL_INTERVAL_SECS;

pub use cluster::ClusterStatePoller;
pub use deployment::DeploymentPoller;
pub use error::{PollError, PollResult};
pub use events::RecentEvent;
pub use status::{PendingReason, ServiceStatus};

/// Loop settings shared by both pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep between iterations.
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &SteadyConfig) -> Self {
        Self {
            interval: config.poll_interval(),
        }
    }
}
