//! steady-health — task health verification for a single service.
//!
//! A service whose running count matches its desired count may still be
//! serving from tasks that have not passed their container health checks.
//! [`TaskHealthChecker`] pages through the service's tasks and reports
//! whether every one of them is `HEALTHY` right now.
//!
//! The check is point-in-time and never retries: the polling loops in
//! `steady-poll` decide when to ask again.

pub mod checker;

pub use checker::{TaskHealth, TaskHealthChecker};
