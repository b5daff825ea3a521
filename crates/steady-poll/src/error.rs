//! Poller error types.

use std::time::Duration;

use thiserror::Error;

use steady_core::{ApiError, ServiceId};

use crate::events::RecentEvent;

/// Errors that end a polling phase.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(
        "polling {target} timed out after {}s, still pending: {}",
        .elapsed.as_secs(),
        join_ids(.pending)
    )]
    Timeout {
        target: String,
        pending: Vec<ServiceId>,
        /// Recent events of the services in the last response.
        events: Vec<RecentEvent>,
        elapsed: Duration,
    },

    #[error("cluster api error: {0}")]
    Api(#[from] ApiError),
}

pub type PollResult<T> = Result<T, PollError>;

pub(crate) fn join_ids(ids: &[ServiceId]) -> String {
    ids.iter()
        .map(ServiceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
