//! Per-iteration evaluation of a described service.
//!
//! These checks are pure: they look at one snapshot and say whether it
//! blocks convergence. Task health is checked separately by the pollers,
//! and only once every check here has passed.

use std::fmt;
use std::time::Duration;

use steady_core::clock::age_of;
use steady_core::{Deployment, DeploymentStatus, RolloutState, Service};

/// Outcome of evaluating one service on one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Stable and healthy; drop it from the pending set.
    Converged,
    /// Not there yet; poll again.
    Pending(PendingReason),
}

/// Why a service is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingReason {
    /// The service was not in the response.
    Missing,
    /// No events to judge staleness by.
    NoEvents,
    /// The newest observation predates the staleness bound.
    Stale { age: Duration },
    /// Running capacity differs from desired capacity.
    Unstable { running: u32, desired: u32 },
    /// The service reports no deployments.
    NoDeployment,
    /// The primary deployment has not finished rolling out.
    RolloutIncomplete {
        status: DeploymentStatus,
        rollout_state: RolloutState,
        running: u32,
        desired: u32,
    },
    /// A task failed its health check.
    Unhealthy { task: String },
}

impl fmt::Display for PendingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing from response"),
            Self::NoEvents => write!(f, "no events yet"),
            Self::Stale { age } => write!(f, "state may be stale ({}s)", age.as_secs()),
            Self::Unstable { running, desired } => {
                write!(f, "{running}/{desired} tasks running")
            }
            Self::NoDeployment => write!(f, "no deployments"),
            Self::RolloutIncomplete {
                status,
                rollout_state,
                running,
                desired,
            } => write!(
                f,
                "deployment {status:?}/{rollout_state:?} with {running}/{desired} tasks"
            ),
            Self::Unhealthy { task } => write!(f, "task {task} is not healthy"),
        }
    }
}

/// Staleness of a service's newest event, measured from `start`.
///
/// A service without events cannot show that it has reacted to the change
/// being polled for, so it is treated as stale too.
pub fn check_events(service: &Service, start: Duration, bound: Duration) -> Option<PendingReason> {
    let Some(latest) = service.latest_event_at() else {
        return Some(PendingReason::NoEvents);
    };
    let age = age_of(latest, start);
    (age > bound).then_some(PendingReason::Stale { age })
}

/// Capacity check on a service's top-level counts.
pub fn check_capacity(service: &Service) -> Option<PendingReason> {
    (!service.is_stable()).then_some(PendingReason::Unstable {
        running: service.running_count,
        desired: service.desired_count,
    })
}

/// Rollout check on a service's primary deployment.
pub fn check_deployment(
    deployment: Option<&Deployment>,
    start: Duration,
    staleness: Option<Duration>,
) -> Option<PendingReason> {
    let Some(deployment) = deployment else {
        return Some(PendingReason::NoDeployment);
    };
    if let Some(bound) = staleness {
        let age = age_of(deployment.created_at, start);
        if age > bound {
            return Some(PendingReason::Stale { age });
        }
    }
    (!deployment.is_stable()).then_some(PendingReason::RolloutIncomplete {
        status: deployment.status,
        rollout_state: deployment.rollout_state,
        running: deployment.running_count,
        desired: deployment.desired_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use steady_core::testing::service;

    const START: Duration = Duration::from_secs(1_000);

    #[test]
    fn recent_event_passes() {
        let svc = service("a", 1, 1, 950);
        assert_eq!(check_events(&svc, START, Duration::from_secs(120)), None);
    }

    #[test]
    fn old_event_is_stale() {
        let svc = service("a", 1, 1, 500);
        assert_eq!(
            check_events(&svc, START, Duration::from_secs(120)),
            Some(PendingReason::Stale {
                age: Duration::from_secs(500)
            })
        );
    }

    #[test]
    fn no_events_is_pending() {
        let mut svc = service("a", 1, 1, 950);
        svc.events.clear();
        assert_eq!(
            check_events(&svc, START, Duration::from_secs(120)),
            Some(PendingReason::NoEvents)
        );
    }

    #[test]
    fn capacity_mismatch_is_unstable() {
        assert_eq!(
            check_capacity(&service("a", 2, 1, 0)),
            Some(PendingReason::Unstable {
                running: 1,
                desired: 2
            })
        );
        assert_eq!(check_capacity(&service("a", 0, 0, 0)), None);
    }

    #[test]
    fn completed_deployment_passes() {
        let svc = service("a", 2, 2, 990);
        assert_eq!(
            check_deployment(svc.primary_deployment(), START, Some(Duration::from_secs(120))),
            None
        );
    }

    #[test]
    fn in_progress_deployment_is_pending_even_at_capacity() {
        let mut svc = service("a", 2, 2, 990);
        svc.deployments[0].rollout_state = RolloutState::InProgress;
        assert!(matches!(
            check_deployment(svc.primary_deployment(), START, None),
            Some(PendingReason::RolloutIncomplete { .. })
        ));
    }

    #[test]
    fn stale_deployment_is_pending() {
        let svc = service("a", 2, 2, 100);
        assert_eq!(
            check_deployment(svc.primary_deployment(), START, Some(Duration::from_secs(120))),
            Some(PendingReason::Stale {
                age: Duration::from_secs(900)
            })
        );
        // Without a bound the same deployment is fine.
        assert_eq!(check_deployment(svc.primary_deployment(), START, None), None);
    }

    #[test]
    fn missing_service_reason_reads_plainly() {
        assert_eq!(PendingReason::Missing.to_string(), "missing from response");
    }

    #[test]
    fn missing_deployment_is_pending() {
        assert_eq!(
            check_deployment(None, START, None),
            Some(PendingReason::NoDeployment)
        );
    }
}
