//! In-memory test doubles: a scripted [`ClusterApi`] and a virtual clock.
//!
//! Enabled with the `testing` feature. `MockClusterApi` replays scripted
//! snapshots (the last snapshot of each script repeats forever) and records
//! every call so tests can assert on mutations. `ManualClock` advances
//! virtual time on every `sleep`, so timeouts fire without waiting.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::ClusterApi;
use crate::clock::Clock;
use crate::error::{ApiError, ApiResult};
use crate::types::*;

// ── Clock ─────────────────────────────────────────────────────────

/// Virtual clock. `sleep(d)` returns immediately after moving time by `d`.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: AtomicUsize,
}

impl ManualClock {
    /// A clock that starts at `start_secs` past the Unix epoch.
    pub fn new(start_secs: u64) -> Self {
        Self {
            now: Mutex::new(Duration::from_secs(start_secs)),
            sleeps: AtomicUsize::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Number of `sleep` calls so far (one per poll iteration).
    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

// ── Cluster API ───────────────────────────────────────────────────

/// A recorded call against [`MockClusterApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListServices,
    DescribeServices(Vec<String>),
    ListTasks {
        service: String,
        page_token: Option<String>,
    },
    DescribeTasks(Vec<String>),
    ListContainerInstances {
        page_token: Option<String>,
    },
    DescribeContainerInstances(Vec<String>),
    UpdateContainerInstancesState {
        instance_arns: Vec<String>,
        status: InstanceStatus,
    },
    TerminateInstances(Vec<String>),
    DescribeTaskDefinition(String),
}

#[derive(Debug)]
struct MockInstance {
    instance: ContainerInstance,
    running_tasks: VecDeque<u32>,
    terminated: bool,
}

#[derive(Debug)]
struct MockState {
    services: Vec<ServiceId>,
    service_snapshots: HashMap<ServiceId, VecDeque<Service>>,
    empty_service_responses: usize,
    empty_instance_responses: usize,
    task_snapshots: HashMap<ServiceId, VecDeque<Vec<Task>>>,
    current_tasks: HashMap<ServiceId, Vec<Task>>,
    instances: Vec<MockInstance>,
    task_definitions: HashMap<String, TaskDefinition>,
    page_size: usize,
    calls: Vec<ApiCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            service_snapshots: HashMap::new(),
            empty_service_responses: 0,
            empty_instance_responses: 0,
            task_snapshots: HashMap::new(),
            current_tasks: HashMap::new(),
            instances: Vec::new(),
            task_definitions: HashMap::new(),
            page_size: MAX_PAGE_SIZE,
            calls: Vec::new(),
        }
    }
}

/// Scripted, call-recording cluster API.
#[derive(Debug, Default)]
pub struct MockClusterApi {
    state: Mutex<MockState>,
}

/// Pop the next scripted value, repeating the last one once the script
/// runs dry.
fn next_sticky<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

fn page_of<T: Clone>(items: &[T], page_token: Option<&str>, page_size: usize) -> Page<T> {
    let offset = page_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
    let end = (offset + page_size).min(items.len());
    let slice = items.get(offset..end).unwrap_or_default().to_vec();
    if end >= items.len() {
        return Page::last(slice);
    }
    Page {
        items: slice,
        next_token: Some(end.to_string()),
    }
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a service that always reports `service`.
    pub fn with_service(self, service: Service) -> Self {
        self.with_service_snapshots(vec![service])
    }

    /// Register a service whose successive descriptions follow `snapshots`.
    pub fn with_service_snapshots(self, snapshots: Vec<Service>) -> Self {
        if let Some(first) = snapshots.first() {
            let id = first.name.clone();
            let mut state = self.state();
            if !state.services.contains(&id) {
                state.services.push(id.clone());
            }
            state.service_snapshots.insert(id, snapshots.into());
        }
        self
    }

    /// The next `count` `describe_services` calls return nothing.
    pub fn with_empty_service_responses(self, count: usize) -> Self {
        self.state().empty_service_responses = count;
        self
    }

    /// The next `count` `describe_container_instances` calls return nothing.
    pub fn with_empty_instance_responses(self, count: usize) -> Self {
        self.state().empty_instance_responses = count;
        self
    }

    /// Tasks `service` always reports.
    pub fn with_tasks(self, service: &str, tasks: Vec<Task>) -> Self {
        self.with_task_snapshots(service, vec![tasks])
    }

    /// Task sets `service` reports, one per full task listing.
    pub fn with_task_snapshots(self, service: &str, snapshots: Vec<Vec<Task>>) -> Self {
        self.state()
            .task_snapshots
            .insert(ServiceId::normalize(service), snapshots.into());
        self
    }

    /// Register a container instance whose `running_tasks_count` follows
    /// `running_tasks` across successive describe calls.
    pub fn with_instance(self, instance: ContainerInstance, running_tasks: Vec<u32>) -> Self {
        self.state().instances.push(MockInstance {
            instance,
            running_tasks: running_tasks.into(),
            terminated: false,
        });
        self
    }

    pub fn with_task_definition(self, task_definition: TaskDefinition) -> Self {
        self.state()
            .task_definitions
            .insert(task_definition.arn.clone(), task_definition);
        self
    }

    /// Page size for every listing call.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size.max(1);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&ApiCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn describe_services_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, ApiCall::DescribeServices(_)))
    }

    /// Calls that touched task listings or task health.
    pub fn task_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, ApiCall::ListTasks { .. } | ApiCall::DescribeTasks(_)))
    }

    /// Instance ARN sets passed to DRAINING transitions, in order.
    pub fn drained(&self) -> Vec<Vec<String>> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::UpdateContainerInstancesState {
                    instance_arns,
                    status: InstanceStatus::Draining,
                } => Some(instance_arns.clone()),
                _ => None,
            })
            .collect()
    }

    /// Instance ids passed to terminate calls, flattened in order.
    pub fn terminated(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::TerminateInstances(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn list_services(&self, _cluster: &str) -> ApiResult<Vec<ServiceId>> {
        let mut state = self.state();
        state.calls.push(ApiCall::ListServices);
        Ok(state.services.clone())
    }

    async fn describe_services(
        &self,
        _cluster: &str,
        services: &[ServiceId],
    ) -> ApiResult<Vec<Service>> {
        let mut state = self.state();
        state.calls.push(ApiCall::DescribeServices(
            services.iter().map(|s| s.to_string()).collect(),
        ));
        if state.empty_service_responses > 0 {
            state.empty_service_responses -= 1;
            return Ok(Vec::new());
        }
        let described = services
            .iter()
            .filter_map(|id| state.service_snapshots.get_mut(id).and_then(next_sticky))
            .collect();
        Ok(described)
    }

    async fn list_tasks(
        &self,
        _cluster: &str,
        service: &ServiceId,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let mut state = self.state();
        state.calls.push(ApiCall::ListTasks {
            service: service.to_string(),
            page_token: page_token.map(str::to_string),
        });
        if page_token.is_none() {
            let snapshot = state
                .task_snapshots
                .get_mut(service)
                .and_then(next_sticky)
                .unwrap_or_default();
            state.current_tasks.insert(service.clone(), snapshot);
        }
        let arns: Vec<String> = state
            .current_tasks
            .get(service)
            .map(|tasks| tasks.iter().map(|t| t.arn.clone()).collect())
            .unwrap_or_default();
        Ok(page_of(&arns, page_token, state.page_size))
    }

    async fn describe_tasks(&self, _cluster: &str, tasks: &[String]) -> ApiResult<Vec<Task>> {
        let mut state = self.state();
        state.calls.push(ApiCall::DescribeTasks(tasks.to_vec()));
        if tasks.is_empty() {
            return Err(ApiError::request("describe_tasks", "tasks cannot be empty"));
        }
        let described = tasks
            .iter()
            .filter_map(|arn| {
                state
                    .current_tasks
                    .values()
                    .flatten()
                    .find(|t| &t.arn == arn)
                    .cloned()
            })
            .collect();
        Ok(described)
    }

    async fn list_container_instances(
        &self,
        _cluster: &str,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let mut state = self.state();
        state.calls.push(ApiCall::ListContainerInstances {
            page_token: page_token.map(str::to_string),
        });
        let arns: Vec<String> = state
            .instances
            .iter()
            .filter(|i| !i.terminated)
            .map(|i| i.instance.arn.clone())
            .collect();
        Ok(page_of(&arns, page_token, state.page_size))
    }

    async fn describe_container_instances(
        &self,
        _cluster: &str,
        instance_arns: &[String],
    ) -> ApiResult<Vec<ContainerInstance>> {
        let mut state = self.state();
        state
            .calls
            .push(ApiCall::DescribeContainerInstances(instance_arns.to_vec()));
        if state.empty_instance_responses > 0 {
            state.empty_instance_responses -= 1;
            return Ok(Vec::new());
        }
        let mut described = Vec::new();
        for arn in instance_arns {
            let Some(mock) = state
                .instances
                .iter_mut()
                .find(|i| &i.instance.arn == arn && !i.terminated)
            else {
                continue;
            };
            if let Some(running) = next_sticky(&mut mock.running_tasks) {
                mock.instance.running_tasks_count = running;
            }
            described.push(mock.instance.clone());
        }
        Ok(described)
    }

    async fn update_container_instances_state(
        &self,
        _cluster: &str,
        instance_arns: &[String],
        status: InstanceStatus,
    ) -> ApiResult<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::UpdateContainerInstancesState {
            instance_arns: instance_arns.to_vec(),
            status: status.clone(),
        });
        for mock in state
            .instances
            .iter_mut()
            .filter(|i| instance_arns.contains(&i.instance.arn))
        {
            mock.instance.status = status.clone();
        }
        Ok(())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> ApiResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(ApiCall::TerminateInstances(instance_ids.to_vec()));
        for mock in state
            .instances
            .iter_mut()
            .filter(|i| instance_ids.contains(&i.instance.id))
        {
            mock.terminated = true;
        }
        Ok(())
    }

    async fn describe_task_definition(&self, task_definition: &str) -> ApiResult<TaskDefinition> {
        let mut state = self.state();
        state
            .calls
            .push(ApiCall::DescribeTaskDefinition(task_definition.to_string()));
        state
            .task_definitions
            .get(task_definition)
            .cloned()
            .ok_or_else(|| {
                ApiError::request(
                    "describe_task_definition",
                    format!("task definition {task_definition} not found"),
                )
            })
    }
}

// ── Fixtures ──────────────────────────────────────────────────────

/// A service with one primary, completed deployment created at
/// `created_at` and a single event at the same time.
pub fn service(name: &str, desired: u32, running: u32, created_at: u64) -> Service {
    Service {
        name: ServiceId::normalize(name),
        desired_count: desired,
        running_count: running,
        deployments: vec![Deployment {
            status: DeploymentStatus::Primary,
            rollout_state: RolloutState::Completed,
            running_count: running,
            desired_count: desired,
            created_at,
        }],
        events: vec![ServiceEvent {
            message: format!("(service {name}) has reached a steady state."),
            created_at,
        }],
        task_definition: None,
    }
}

pub fn task(arn: &str, health_status: TaskHealthStatus) -> Task {
    Task {
        arn: arn.to_string(),
        health_status,
    }
}

/// `count` healthy tasks named `{prefix}-0`, `{prefix}-1`, ...
pub fn healthy_tasks(prefix: &str, count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| task(&format!("{prefix}-{i}"), TaskHealthStatus::Healthy))
        .collect()
}

/// An active container instance; the ARN is derived from the id.
pub fn instance(id: &str, ami_id: &str) -> ContainerInstance {
    ContainerInstance {
        arn: format!("arn:container-instance/{id}"),
        id: id.to_string(),
        status: InstanceStatus::Active,
        running_tasks_count: 0,
        ami_id: Some(ami_id.to_string()),
    }
}
