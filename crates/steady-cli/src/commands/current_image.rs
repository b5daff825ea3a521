use anyhow::{Context, anyhow};

use steady_core::{ClusterApi, ServiceId};

/// Image of the first container in the service's current task definition.
pub async fn lookup(api: &dyn ClusterApi, cluster: &str, service: &str) -> anyhow::Result<String> {
    let service = ServiceId::normalize(service);
    let described = api
        .describe_services(cluster, std::slice::from_ref(&service))
        .await
        .with_context(|| format!("failed to describe service {service}"))?;

    let task_definition = described
        .iter()
        .find(|s| s.name == service)
        .ok_or_else(|| anyhow!("service {service} not found in cluster {cluster}"))?
        .task_definition
        .as_deref()
        .ok_or_else(|| anyhow!("service {service} has no task definition"))?;

    let definition = api
        .describe_task_definition(task_definition)
        .await
        .with_context(|| format!("failed to describe task definition {task_definition}"))?;

    definition
        .containers
        .first()
        .and_then(|c| c.image.clone())
        .ok_or_else(|| anyhow!("task definition {task_definition} has no container image"))
}

pub async fn run(api: &dyn ClusterApi, cluster: &str, service: &str) -> anyhow::Result<()> {
    let image = lookup(api, cluster, service).await?;
    println!("{image}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use steady_core::testing::{MockClusterApi, service};
    use steady_core::{ContainerDefinition, TaskDefinition};

    const TD: &str = "arn:aws:ecs:us-east-1:1:task-definition/foo:3";

    fn cluster_with(containers: Vec<ContainerDefinition>) -> MockClusterApi {
        let mut svc = service("service-foo", 1, 1, 0);
        svc.task_definition = Some(TD.to_string());
        MockClusterApi::new()
            .with_service(svc)
            .with_task_definition(TaskDefinition {
                arn: TD.to_string(),
                containers,
            })
    }

    fn container(name: &str, image: &str) -> ContainerDefinition {
        ContainerDefinition {
            name: name.to_string(),
            image: Some(image.to_string()),
        }
    }

    #[tokio::test]
    async fn prints_first_container_image() {
        let api = cluster_with(vec![
            container("app", "registry/app:1.2.3"),
            container("sidecar", "registry/proxy:9"),
        ]);

        let image = lookup(&api, "cluster-foo", "arn:aws:ecs:us-east-1:1:service/cluster-foo/service-foo")
            .await
            .unwrap();
        assert_eq!(image, "registry/app:1.2.3");
    }

    #[tokio::test]
    async fn unknown_service_is_an_error() {
        let api = cluster_with(vec![container("app", "registry/app:1")]);
        let err = lookup(&api, "cluster-foo", "service-bar").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn task_definition_without_containers_is_an_error() {
        let api = cluster_with(Vec::new());
        assert!(lookup(&api, "cluster-foo", "service-foo").await.is_err());
    }
}
