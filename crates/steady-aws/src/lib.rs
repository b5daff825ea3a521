//! steady-aws — [`ClusterApi`](steady_core::ClusterApi) backed by AWS.
//!
//! Cluster, service, task and container instance calls go to ECS;
//! instance termination goes to EC2. SDK shapes are converted to the
//! domain types in `steady-core` at this boundary, including service ARN
//! normalization.

pub mod client;
pub mod convert;

pub use client::{AwsClusterApi, AwsSettings};
