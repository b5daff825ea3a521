//! Rolling replacement error types.

use std::time::Duration;

use thiserror::Error;

use steady_core::ApiError;
use steady_poll::PollError;

/// Errors that abort a rolling replacement.
#[derive(Debug, Error)]
pub enum RolloutError {
    /// Raised before any instance is touched, or when a batch describes
    /// to nothing.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Raised after DRAINING was issued; the batch is left mid-drain.
    #[error(
        "batch {batch}: instances {} did not finish draining within {}s",
        .pending.join(", "),
        .timeout.as_secs()
    )]
    DrainTimeout {
        batch: usize,
        pending: Vec<String>,
        timeout: Duration,
    },

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("cluster api error: {0}")]
    Api(#[from] ApiError),
}

pub type RolloutResult<T> = Result<T, RolloutError>;
