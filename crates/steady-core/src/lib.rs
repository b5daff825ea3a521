//! steady-core — shared vocabulary for the steady workspace.
//!
//! Holds the cluster domain types, the [`ClusterApi`] contract every
//! remote call goes through, the injectable [`Clock`], the `steady.toml`
//! configuration, and the error types shared across crates.
//!
//! # Components
//!
//! - **`types`** — services, deployments, tasks, container instances
//! - **`api`** — the `ClusterApi` trait (the only I/O boundary)
//! - **`clock`** — `Clock` trait and the system implementation
//! - **`config`** — `steady.toml` parser with defaults
//! - **`testing`** — `MockClusterApi` and `ManualClock` (feature `testing`)

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use api::ClusterApi;
pub use clock::{Clock, SystemClock};
pub use config::SteadyConfig;
pub use error::{ApiError, ApiResult, ConfigError};
pub use types::*;
