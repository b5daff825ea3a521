//! Batch planning.
//!
//! Splits the fleet into at most `batches` consecutive chunks of
//! `ceil(total / batches)` instances. Every guard here runs before any
//! instance is drained.

use tracing::{info, warn};

use steady_core::MAX_PAGE_SIZE;

use crate::error::{RolloutError, RolloutResult};

/// Largest batch the container instance API accepts in one call.
pub const MAX_BATCH_SIZE: usize = MAX_PAGE_SIZE;

/// One drain/terminate unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position in the run.
    pub index: usize,
    /// Container instance ARNs, in listing order.
    pub instance_arns: Vec<String>,
}

/// Instances per batch for `total` instances split `batches` ways.
pub fn batch_size(total: usize, batches: u32) -> usize {
    total.div_ceil(batches.max(1) as usize)
}

/// Partition `instance_arns` into batches.
///
/// Refuses a plan whose single batch would hold the whole fleet unless
/// `force` is set, and any batch larger than [`MAX_BATCH_SIZE`].
pub fn plan_batches(
    instance_arns: Vec<String>,
    batches: u32,
    force: bool,
) -> RolloutResult<Vec<Batch>> {
    if batches == 0 {
        return Err(RolloutError::Precondition(
            "batch count must be at least 1".to_string(),
        ));
    }
    if instance_arns.is_empty() {
        return Err(RolloutError::Precondition(
            "no container instances found in cluster".to_string(),
        ));
    }

    let total = instance_arns.len();
    let size = batch_size(total, batches);
    info!(instances = total, batch_size = size, "planning batches");

    if total <= size {
        warn!("terminating {size} instances will cause downtime");
        if !force {
            return Err(RolloutError::Precondition(format!(
                "a single batch would replace all {total} instances; use --force to override"
            )));
        }
    }

    if size > MAX_BATCH_SIZE {
        return Err(RolloutError::Precondition(format!(
            "batch size {size} exceeds the limit of {MAX_BATCH_SIZE}, use more batches"
        )));
    }

    Ok(instance_arns
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            instance_arns: chunk.to_vec(),
        })
        .collect())
}
