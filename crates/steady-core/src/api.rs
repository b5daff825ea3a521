//! The cluster API contract.
//!
//! Every read and write the pollers and the replacer perform goes through
//! [`ClusterApi`]. Implementations own transport, credentials and wire
//! formats; callers only see the domain types in [`crate::types`].

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::types::{
    ContainerInstance, InstanceStatus, Page, Service, ServiceId, Task, TaskDefinition,
};

/// Operations the core needs from a container orchestration API.
///
/// Listing calls are token-paginated; a page without a continuation token
/// is the last one. Implementations must not retry terminal errors on the
/// caller's behalf: polling loops own the retry policy.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// All services in the cluster, normalized to bare names.
    async fn list_services(&self, cluster: &str) -> ApiResult<Vec<ServiceId>>;

    /// Current descriptions of the named services. Unknown names are
    /// omitted from the result.
    async fn describe_services(
        &self,
        cluster: &str,
        services: &[ServiceId],
    ) -> ApiResult<Vec<Service>>;

    /// One page of task ARNs belonging to `service`.
    async fn list_tasks(
        &self,
        cluster: &str,
        service: &ServiceId,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>>;

    /// Health of the given tasks. `tasks` holds at most one page.
    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> ApiResult<Vec<Task>>;

    /// One page of container instance ARNs.
    async fn list_container_instances(
        &self,
        cluster: &str,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>>;

    /// Current descriptions of the given container instances.
    async fn describe_container_instances(
        &self,
        cluster: &str,
        instance_arns: &[String],
    ) -> ApiResult<Vec<ContainerInstance>>;

    /// Move container instances to `status` in one bulk call.
    async fn update_container_instances_state(
        &self,
        cluster: &str,
        instance_arns: &[String],
        status: InstanceStatus,
    ) -> ApiResult<()>;

    /// Terminate the compute instances with the given ids.
    async fn terminate_instances(&self, instance_ids: &[String]) -> ApiResult<()>;

    /// Look up a task definition by ARN or `family:revision`.
    async fn describe_task_definition(&self, task_definition: &str) -> ApiResult<TaskDefinition>;
}
