use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecs::config::Region;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::ContainerInstanceStatus;
use tracing::{debug, warn};

use steady_core::{
    ApiError, ApiResult, ClusterApi, ContainerInstance, InstanceStatus, MAX_PAGE_SIZE, Page,
    Service, ServiceId, SteadyConfig, Task, TaskDefinition,
};

use crate::convert;

/// DescribeServices accepts at most this many names per call.
const DESCRIBE_SERVICES_LIMIT: usize = 10;

/// Connection settings. Anything unset falls back to the default AWS
/// provider chain.
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    pub region: Option<String>,
    /// Override for both ECS and EC2, e.g. a local emulator.
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub fn from_config(config: &SteadyConfig) -> Self {
        Self {
            region: config.region().map(str::to_string),
            endpoint_url: config.endpoint_url().map(str::to_string),
        }
    }
}

fn request_error<E>(operation: &'static str, err: E) -> ApiError
where
    E: std::error::Error,
{
    ApiError::request(operation, DisplayErrorContext(&err).to_string())
}

/// [`ClusterApi`] over the ECS and EC2 SDK clients.
#[derive(Debug, Clone)]
pub struct AwsClusterApi {
    ecs: aws_sdk_ecs::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsClusterApi {
    pub async fn connect(settings: &AwsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        debug!(region = ?sdk_config.region(), "aws clients configured");

        Self {
            ecs: aws_sdk_ecs::Client::new(&sdk_config),
            ec2: aws_sdk_ec2::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl ClusterApi for AwsClusterApi {
    async fn list_services(&self, cluster: &str) -> ApiResult<Vec<ServiceId>> {
        let mut services = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let out = self
                .ecs
                .list_services()
                .cluster(cluster)
                .max_results(MAX_PAGE_SIZE as i32)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| request_error("list_services", e))?;

            services.extend(out.service_arns().iter().map(|arn| ServiceId::normalize(arn)));
            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(services)
    }

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[ServiceId],
    ) -> ApiResult<Vec<Service>> {
        let mut described = Vec::with_capacity(services.len());
        for chunk in services.chunks(DESCRIBE_SERVICES_LIMIT) {
            let names = chunk.iter().map(|s| s.as_str().to_string()).collect();
            let out = self
                .ecs
                .describe_services()
                .cluster(cluster)
                .set_services(Some(names))
                .send()
                .await
                .map_err(|e| request_error("describe_services", e))?;

            for failure in out.failures() {
                warn!(
                    %cluster,
                    arn = failure.arn().unwrap_or_default(),
                    reason = failure.reason().unwrap_or_default(),
                    "service not described"
                );
            }
            for svc in out.services() {
                described.push(convert::service(svc)?);
            }
        }
        Ok(described)
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        service: &ServiceId,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let out = self
            .ecs
            .list_tasks()
            .cluster(cluster)
            .service_name(service.as_str())
            .max_results(MAX_PAGE_SIZE as i32)
            .set_next_token(page_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| request_error("list_tasks", e))?;

        Ok(Page {
            items: out.task_arns().to_vec(),
            next_token: out.next_token().map(str::to_string),
        })
    }

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> ApiResult<Vec<Task>> {
        let out = self
            .ecs
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(tasks.to_vec()))
            .send()
            .await
            .map_err(|e| request_error("describe_tasks", e))?;

        out.tasks().iter().map(convert::task).collect()
    }

    async fn list_container_instances(
        &self,
        cluster: &str,
        page_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let out = self
            .ecs
            .list_container_instances()
            .cluster(cluster)
            .max_results(MAX_PAGE_SIZE as i32)
            .set_next_token(page_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| request_error("list_container_instances", e))?;

        Ok(Page {
            items: out.container_instance_arns().to_vec(),
            next_token: out.next_token().map(str::to_string),
        })
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        instance_arns: &[String],
    ) -> ApiResult<Vec<ContainerInstance>> {
        if instance_arns.is_empty() {
            return Ok(Vec::new());
        }
        let out = self
            .ecs
            .describe_container_instances()
            .cluster(cluster)
            .set_container_instances(Some(instance_arns.to_vec()))
            .send()
            .await
            .map_err(|e| request_error("describe_container_instances", e))?;

        out.container_instances()
            .iter()
            .map(convert::container_instance)
            .collect()
    }

    async fn update_container_instances_state(
        &self,
        cluster: &str,
        instance_arns: &[String],
        status: InstanceStatus,
    ) -> ApiResult<()> {
        let out = self
            .ecs
            .update_container_instances_state()
            .cluster(cluster)
            .set_container_instances(Some(instance_arns.to_vec()))
            .status(ContainerInstanceStatus::from(status.as_str()))
            .send()
            .await
            .map_err(|e| request_error("update_container_instances_state", e))?;

        if let Some(failure) = out.failures().first() {
            return Err(ApiError::request(
                "update_container_instances_state",
                format!(
                    "{} failed for {}: {}",
                    status,
                    failure.arn().unwrap_or("unknown"),
                    failure.reason().unwrap_or("no reason given")
                ),
            ));
        }
        Ok(())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> ApiResult<()> {
        self.ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| request_error("terminate_instances", e))?;
        Ok(())
    }

    async fn describe_task_definition(&self, task_definition: &str) -> ApiResult<TaskDefinition> {
        let out = self
            .ecs
            .describe_task_definition()
            .task_definition(task_definition)
            .send()
            .await
            .map_err(|e| request_error("describe_task_definition", e))?;

        out.task_definition()
            .map(convert::task_definition)
            .ok_or_else(|| {
                ApiError::malformed(
                    "describe_task_definition",
                    format!("no task definition returned for {task_definition}"),
                )
            })
    }
}
