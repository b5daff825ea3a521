//! Domain types for cluster state.
//!
//! These mirror what the orchestrator reports about services, deployments,
//! tasks and container instances. Nothing here is persisted: every poll
//! rehydrates fresh values through [`ClusterApi`](crate::ClusterApi).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest page the cluster API returns, and the per-call instance limit
/// for container instance operations.
pub const MAX_PAGE_SIZE: usize = 100;

// ── Service identity ──────────────────────────────────────────────

/// Canonical service identifier: the bare service name.
///
/// Service names never contain `/`, so the final path segment of any
/// qualified form (`cluster/name`, `arn:...:service/cluster/name`, or the
/// legacy `arn:...:service/name`) is the name itself. Normalizing once at
/// the boundary keeps pending-set membership exact even when a cluster and
/// a service share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Normalize any accepted service reference to its bare name.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim().trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

// ── Service ───────────────────────────────────────────────────────

/// A service as reported by a single `describe_services` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: ServiceId,
    pub desired_count: u32,
    pub running_count: u32,
    /// Deployments, the primary one first.
    pub deployments: Vec<Deployment>,
    /// Recent service events, newest first.
    pub events: Vec<ServiceEvent>,
    /// Task definition the service currently runs.
    pub task_definition: Option<String>,
}

impl Service {
    /// A service with nothing to run is exempt from task health checks.
    pub fn is_active(&self) -> bool {
        self.desired_count > 0
    }

    /// Running capacity matches desired capacity.
    pub fn is_stable(&self) -> bool {
        self.running_count == self.desired_count
    }

    /// Creation time of the newest event, if any.
    pub fn latest_event_at(&self) -> Option<u64> {
        self.events.iter().map(|e| e.created_at).max()
    }

    /// The deployment that drives rollout checks.
    pub fn primary_deployment(&self) -> Option<&Deployment> {
        self.deployments.first()
    }
}

/// One rollout generation of a service's task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub status: DeploymentStatus,
    pub rollout_state: RolloutState,
    pub running_count: u32,
    pub desired_count: u32,
    /// Unix timestamp (seconds).
    pub created_at: u64,
}

impl Deployment {
    /// Primary, fully rolled out, and at capacity.
    pub fn is_stable(&self) -> bool {
        self.status == DeploymentStatus::Primary
            && self.rollout_state == RolloutState::Completed
            && self.running_count == self.desired_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Primary,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutState {
    InProgress,
    Completed,
    Failed,
}

/// A service event message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub message: String,
    /// Unix timestamp (seconds).
    pub created_at: u64,
}

// ── Task ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub arn: String,
    pub health_status: TaskHealthStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskHealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl fmt::Display for TaskHealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "HEALTHY",
            Self::Unhealthy => "UNHEALTHY",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// ── Container instance ────────────────────────────────────────────

/// A compute host registered with the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    /// Container instance ARN; the handle for cluster API calls.
    pub arn: String,
    /// Underlying compute instance id; the handle for termination.
    pub id: String,
    pub status: InstanceStatus,
    pub running_tasks_count: u32,
    /// Machine image the host was launched from, if reported.
    pub ami_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Active,
    Draining,
    /// Any other lifecycle state (registering, deregistering, ...).
    Other(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draining => "DRAINING",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Task definition ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub arn: String,
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: Option<String>,
}

// ── Pagination ────────────────────────────────────────────────────

/// One page of a token-paginated listing. `next_token == None` marks the
/// last page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}
