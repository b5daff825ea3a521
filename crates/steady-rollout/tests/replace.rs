//! Rolling replacement scenarios against the in-memory cluster API.

use std::sync::Arc;
use std::time::Duration;

use steady_core::testing::{ManualClock, MockClusterApi, healthy_tasks, instance, service};
use steady_core::InstanceStatus;
use steady_poll::{PollError, PollSettings};
use steady_rollout::{BatchPhase, ReplaceOptions, ReplaceSettings, RollingReplacer, RolloutError};

const START: u64 = 1_700_000_000;

fn settings() -> ReplaceSettings {
    ReplaceSettings {
        poll: PollSettings {
            interval: Duration::from_secs(1),
        },
        precheck_timeout: Duration::from_secs(120),
    }
}

fn options(batches: u32, target_ami: Option<&str>) -> ReplaceOptions {
    ReplaceOptions {
        batches,
        target_ami: target_ami.map(str::to_string),
        force: false,
        drain_timeout: Duration::from_secs(10),
    }
}

fn steady_cluster() -> MockClusterApi {
    MockClusterApi::new()
        .with_service(service("service-foo", 2, 2, START))
        .with_tasks("service-foo", healthy_tasks("task", 2))
}

fn arn(id: &str) -> String {
    format!("arn:container-instance/{id}")
}

fn replacer(api: &Arc<MockClusterApi>, clock: &Arc<ManualClock>) -> RollingReplacer {
    RollingReplacer::new(api.clone(), clock.clone(), settings())
}

#[tokio::test]
async fn two_instances_in_two_batches() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            // Batch 2 still has a task on the first drain check.
            .with_instance(instance("baz", "ami1"), vec![1, 1, 0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let summary = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, None))
        .await
        .unwrap();

    assert_eq!(api.drained(), vec![vec![arn("biz")], vec![arn("baz")]]);
    assert_eq!(api.terminated(), vec!["biz".to_string(), "baz".to_string()]);
    // One precheck, then one steady-state check per batch.
    assert_eq!(api.describe_services_calls(), 3);

    assert_eq!(summary.instances, 2);
    assert_eq!(summary.terminated(), 2);
    assert!(summary.batches.iter().all(|b| b.phase == BatchPhase::Verified));
}

#[tokio::test]
async fn whole_fleet_batch_is_refused_without_force() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(1, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Precondition(_)));
    assert!(api.drained().is_empty());
    assert!(api.terminated().is_empty());
}

#[tokio::test]
async fn whole_fleet_batch_with_force() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![0]),
    );
    let clock = Arc::new(ManualClock::new(START));
    let opts = ReplaceOptions {
        force: true,
        ..options(1, None)
    };

    let summary = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &opts)
        .await
        .unwrap();

    assert_eq!(api.drained(), vec![vec![arn("biz"), arn("baz")]]);
    assert_eq!(summary.batches.len(), 1);
    assert_eq!(summary.terminated(), 2);
}

#[tokio::test]
async fn instances_on_target_ami_are_left_alone() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami2"), vec![1, 0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let summary = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, Some("ami1")))
        .await
        .unwrap();

    // Batch 1 holds only "biz", already on ami1: no DRAINING call at all.
    assert_eq!(api.drained(), vec![vec![arn("baz")]]);
    assert_eq!(api.terminated(), vec!["baz".to_string()]);
    assert_eq!(summary.batches[0].phase, BatchPhase::Skipped);
    assert_eq!(summary.batches[0].up_to_date, vec!["biz".to_string()]);
    assert_eq!(summary.batches[1].phase, BatchPhase::Verified);
    // Skipped batches are not re-verified.
    assert_eq!(api.describe_services_calls(), 2);
}

#[tokio::test]
async fn rerun_after_full_replacement_touches_nothing() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("new-1", "ami2"), vec![0])
            .with_instance(instance("new-2", "ami2"), vec![0])
            .with_instance(instance("new-3", "ami2"), vec![0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let summary = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(3, Some("ami2")))
        .await
        .unwrap();

    assert!(api.drained().is_empty());
    assert!(api.terminated().is_empty());
    assert!(summary.batches.iter().all(|b| b.phase == BatchPhase::Skipped));
}

#[tokio::test]
async fn instance_that_never_drains_times_out() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![1]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, None))
        .await
        .unwrap_err();

    match err {
        RolloutError::DrainTimeout { batch, pending, .. } => {
            assert_eq!(batch, 2);
            assert_eq!(pending, vec!["baz".to_string()]);
        }
        other => panic!("expected drain timeout, got {other}"),
    }
    // Batch 1 finished and is not rolled back; batch 2 was left draining.
    assert_eq!(api.terminated(), vec!["biz".to_string()]);
    assert_eq!(api.drained().len(), 2);
}

#[tokio::test]
async fn already_draining_instance_is_terminated_without_new_transition() {
    let mut draining = instance("baz", "ami1");
    draining.status = InstanceStatus::Draining;
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(draining, vec![2, 0]),
    );
    let clock = Arc::new(ManualClock::new(START));
    let opts = ReplaceOptions {
        force: true,
        ..options(1, None)
    };

    replacer(&api, &clock)
        .rolling_replace("cluster-foo", &opts)
        .await
        .unwrap();

    assert_eq!(api.drained(), vec![vec![arn("biz")]]);
    let mut terminated = api.terminated();
    terminated.sort();
    assert_eq!(terminated, vec!["baz".to_string(), "biz".to_string()]);
}

#[tokio::test]
async fn empty_cluster_is_refused() {
    let api = Arc::new(MockClusterApi::new().with_instance(instance("biz", "ami1"), vec![0]));
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(3, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Precondition(_)));
    assert!(api.drained().is_empty());
}

#[tokio::test]
async fn cluster_without_instances_is_refused() {
    let api = Arc::new(steady_cluster());
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(3, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Precondition(_)));
}

#[tokio::test]
async fn unsettled_cluster_fails_precheck_before_any_drain() {
    let api = Arc::new(
        MockClusterApi::new()
            .with_service(service("service-foo", 2, 1, START))
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Poll(PollError::Timeout { .. })));
    assert!(api.drained().is_empty());
}

#[tokio::test]
async fn summary_serializes_for_reporting() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![0]),
    );
    let clock = Arc::new(ManualClock::new(START));

    let summary = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, None))
        .await
        .unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["cluster"], "cluster-foo");
    assert_eq!(json["batches"][0]["phase"], "verified");
    assert_eq!(json["batches"][1]["terminated"][0], "baz");
}

#[tokio::test]
async fn batch_that_describes_to_nothing_fails_before_draining() {
    let api = Arc::new(
        steady_cluster()
            .with_instance(instance("biz", "ami1"), vec![0])
            .with_instance(instance("baz", "ami1"), vec![0])
            .with_empty_instance_responses(1),
    );
    let clock = Arc::new(ManualClock::new(START));

    let err = replacer(&api, &clock)
        .rolling_replace("cluster-foo", &options(2, None))
        .await
        .unwrap_err();

    match err {
        RolloutError::Precondition(message) => assert!(message.contains("batch 1")),
        other => panic!("expected precondition failure, got {other}"),
    }
    assert!(api.drained().is_empty());
    assert!(api.terminated().is_empty());
}
