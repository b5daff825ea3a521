//! End-to-end polling scenarios against the in-memory cluster API.

use std::sync::Arc;
use std::time::Duration;

use steady_core::testing::{ManualClock, MockClusterApi, healthy_tasks, service, task};
use steady_core::{RolloutState, ServiceId, TaskHealthStatus};
use steady_poll::{ClusterStatePoller, DeploymentPoller, PollError, PollSettings};

const START: u64 = 1_700_000_000;
const POLL: Duration = Duration::from_secs(10);

fn one_second() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(1),
    }
}

fn bad_tasks() -> Vec<steady_core::Task> {
    vec![
        task("foo", TaskHealthStatus::Healthy),
        task("bar", TaskHealthStatus::Unhealthy),
    ]
}

#[tokio::test]
async fn deployment_of_healthy_service_completes() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("service-foo", 2, 2, START))
            .with_tasks("service-foo", healthy_tasks("task", 2)),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    poller
        .poll("cluster-foo", &ServiceId::normalize("service-foo"), POLL, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn deployment_short_of_capacity_times_out_after_ten_iterations() {
    let api = Arc::new(MockClusterApi::new().with_service(service("service-foo", 2, 1, START)));
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    let err = poller
        .poll("cluster-foo", &ServiceId::normalize("service-foo"), POLL, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Timeout { .. }));
    assert_eq!(api.describe_services_calls(), 10);
    assert_eq!(clock.sleeps(), 11);
}

#[tokio::test]
async fn deployment_waits_for_tasks_to_become_healthy() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("service-foo", 2, 2, START))
            .with_task_snapshots("service-foo", vec![bad_tasks(), healthy_tasks("task", 2)]),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    poller
        .poll("cluster-foo", &ServiceId::normalize("service-foo"), POLL, None)
        .await
        .unwrap();
    assert_eq!(clock.sleeps(), 2);
}

#[tokio::test]
async fn deployment_in_progress_times_out() {
    let mut svc = service("service-foo", 2, 2, START);
    svc.deployments[0].rollout_state = RolloutState::InProgress;
    let api = Arc::new(MockClusterApi::new().with_service(svc));
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    let err = poller
        .poll("cluster-foo", &ServiceId::normalize("service-foo"), POLL, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::Timeout { .. }));
    assert_eq!(api.task_calls(), 0);
}

#[tokio::test]
async fn deployment_with_chronically_bad_tasks_times_out() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("service-foo", 2, 2, START))
            .with_tasks("service-foo", bad_tasks()),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    let err = poller
        .poll("cluster-foo", &ServiceId::normalize("service-foo"), POLL, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::Timeout { .. }));
}

#[tokio::test]
async fn stale_deployment_is_not_trusted() {
    // Deployment created ten minutes before polling began.
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("service-foo", 2, 2, START - 600))
            .with_tasks("service-foo", healthy_tasks("task", 2)),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = DeploymentPoller::new(api.clone(), clock.clone(), one_second());

    let err = poller
        .poll(
            "cluster-foo",
            &ServiceId::normalize("service-foo"),
            POLL,
            Some(Duration::from_secs(120)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::Timeout { .. }));
    assert_eq!(api.task_calls(), 0);
}

#[tokio::test]
async fn cluster_with_mixed_services_reaches_steady_state() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("web", 3, 3, START))
            .with_tasks("web", healthy_tasks("web", 3))
            .with_service(service("worker", 0, 0, START))
            .with_service_snapshots(vec![
                service("api", 2, 0, START),
                service("api", 2, 1, START),
                service("api", 2, 2, START),
            ])
            .with_tasks("api", healthy_tasks("api", 2)),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = ClusterStatePoller::new(api.clone(), clock.clone(), one_second());
    let services: Vec<ServiceId> = ["cluster-foo/web", "worker", "api"]
        .iter()
        .map(|s| ServiceId::normalize(s))
        .collect();

    poller
        .poll("cluster-foo", &services, POLL, None)
        .await
        .unwrap();
    assert_eq!(clock.sleeps(), 3);
}

#[tokio::test]
async fn cluster_timeout_reports_only_unconverged_services() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("web", 1, 1, START))
            .with_tasks("web", healthy_tasks("web", 1))
            .with_service(service("api", 2, 1, START)),
    );
    let clock = Arc::new(ManualClock::new(START));
    let poller = ClusterStatePoller::new(api.clone(), clock.clone(), one_second());
    let services = vec![ServiceId::normalize("web"), ServiceId::normalize("api")];

    let err = poller
        .poll("cluster-foo", &services, POLL, None)
        .await
        .unwrap_err();

    match err {
        PollError::Timeout { pending, .. } => {
            assert_eq!(pending, vec![ServiceId::normalize("api")]);
        }
        other => panic!("expected timeout, got {other}"),
    }
    assert_eq!(services.len(), 2);
}
