//! steady-rollout — rolling replacement of a cluster's compute instances.
//!
//! Replaces container instances batch by batch: drain, wait for the
//! tasks to move off, terminate, then wait for the cluster to settle on
//! the replacement capacity before touching the next batch. A cluster
//! steady-state check gates the whole operation and every batch.
//!
//! # Recovery
//!
//! Batches only move forward (`Pending → Draining → Terminating →
//! Verified`, or `Skipped`). A failure aborts the run without rolling
//! anything back; re-running with the same target AMI is safe because
//! instances already on that AMI are never drained again.
//!
//! # Components
//!
//! - **`strategy`** — run options and loop settings
//! - **`batch`** — batch sizing and capacity guards
//! - **`controller`** — `RollingReplacer`, the per-batch state machine

pub mod batch;
pub mod controller;
pub mod error;
pub mod strategy;

pub use batch::{Batch, plan_batches};
pub use controller::{BatchPhase, BatchReport, ReplaceSummary, RollingReplacer};
pub use error::{RolloutError, RolloutResult};
pub use strategy::{ReplaceOptions, ReplaceSettings};
