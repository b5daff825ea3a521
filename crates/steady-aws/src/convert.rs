//! ECS SDK shapes → steady domain types.

use aws_sdk_ecs::primitives::DateTime;
use aws_sdk_ecs::types as ecs;

use steady_core::{
    ApiError, ApiResult, ContainerDefinition, ContainerInstance, Deployment, DeploymentStatus,
    InstanceStatus, RolloutState, Service, ServiceEvent, ServiceId, Task, TaskDefinition,
    TaskHealthStatus,
};

/// Container instance attribute carrying the AMI the host booted from.
pub const AMI_ATTRIBUTE: &str = "ecs.ami-id";

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn epoch_secs(at: Option<&DateTime>) -> u64 {
    at.map(|t| u64::try_from(t.secs()).unwrap_or(0))
        .unwrap_or(0)
}

pub fn service(svc: &ecs::Service) -> ApiResult<Service> {
    let name = svc
        .service_name()
        .ok_or_else(|| ApiError::malformed("describe_services", "service without a name"))?;

    Ok(Service {
        name: ServiceId::normalize(name),
        desired_count: count(svc.desired_count()),
        running_count: count(svc.running_count()),
        deployments: svc.deployments().iter().map(deployment).collect(),
        events: svc
            .events()
            .iter()
            .map(|e| ServiceEvent {
                message: e.message().unwrap_or_default().to_string(),
                created_at: epoch_secs(e.created_at()),
            })
            .collect(),
        task_definition: svc.task_definition().map(str::to_string),
    })
}

pub fn deployment(d: &ecs::Deployment) -> Deployment {
    let status = match d.status() {
        Some("PRIMARY") => DeploymentStatus::Primary,
        Some("ACTIVE") => DeploymentStatus::Active,
        _ => DeploymentStatus::Inactive,
    };
    // Deployments outside the ECS controller report no rollout state;
    // they are never considered complete.
    let rollout_state = match d.rollout_state() {
        Some(ecs::DeploymentRolloutState::Completed) => RolloutState::Completed,
        Some(ecs::DeploymentRolloutState::Failed) => RolloutState::Failed,
        _ => RolloutState::InProgress,
    };

    Deployment {
        status,
        rollout_state,
        running_count: count(d.running_count()),
        desired_count: count(d.desired_count()),
        created_at: epoch_secs(d.created_at()),
    }
}

pub fn task(t: &ecs::Task) -> ApiResult<Task> {
    let arn = t
        .task_arn()
        .ok_or_else(|| ApiError::malformed("describe_tasks", "task without an arn"))?;
    let health_status = match t.health_status() {
        Some(ecs::HealthStatus::Healthy) => TaskHealthStatus::Healthy,
        Some(ecs::HealthStatus::Unhealthy) => TaskHealthStatus::Unhealthy,
        _ => TaskHealthStatus::Unknown,
    };
    Ok(Task {
        arn: arn.to_string(),
        health_status,
    })
}

pub fn container_instance(ci: &ecs::ContainerInstance) -> ApiResult<ContainerInstance> {
    let arn = ci.container_instance_arn().ok_or_else(|| {
        ApiError::malformed("describe_container_instances", "instance without an arn")
    })?;
    let id = ci.ec2_instance_id().ok_or_else(|| {
        ApiError::malformed(
            "describe_container_instances",
            format!("{arn} has no ec2 instance id"),
        )
    })?;
    let status = match ci.status() {
        Some("ACTIVE") => InstanceStatus::Active,
        Some("DRAINING") => InstanceStatus::Draining,
        Some(other) => InstanceStatus::Other(other.to_string()),
        None => InstanceStatus::Other("UNKNOWN".to_string()),
    };
    let ami_id = ci
        .attributes()
        .iter()
        .find(|a| a.name() == AMI_ATTRIBUTE)
        .and_then(|a| a.value())
        .map(str::to_string);

    Ok(ContainerInstance {
        arn: arn.to_string(),
        id: id.to_string(),
        status,
        running_tasks_count: count(ci.running_tasks_count()),
        ami_id,
    })
}

pub fn task_definition(td: &ecs::TaskDefinition) -> TaskDefinition {
    TaskDefinition {
        arn: td.task_definition_arn().unwrap_or_default().to_string(),
        containers: td
            .container_definitions()
            .iter()
            .map(|c| ContainerDefinition {
                name: c.name().unwrap_or_default().to_string(),
                image: c.image().map(str::to_string),
            })
            .collect(),
    }
}
