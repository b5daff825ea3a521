//! Task health check logic.
//!
//! Lists a service's tasks page by page and stops at the first task that
//! is not `HEALTHY`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use steady_core::{ApiResult, ClusterApi, ServiceId, TaskHealthStatus};

/// Result of a single health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskHealth {
    /// Every task reported `HEALTHY`.
    Healthy { count: usize },
    /// The first task found not `HEALTHY`.
    Unhealthy {
        task: String,
        status: TaskHealthStatus,
    },
}

impl TaskHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Verifies that all tasks of a service report healthy.
#[derive(Clone)]
pub struct TaskHealthChecker {
    api: Arc<dyn ClusterApi>,
}

impl TaskHealthChecker {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Check every task of `service` in `cluster`.
    ///
    /// Returns on the first unhealthy task without fetching further pages.
    pub async fn check(&self, cluster: &str, service: &ServiceId) -> ApiResult<TaskHealth> {
        let mut healthy = 0;
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_tasks(cluster, service, page_token.as_deref())
                .await?;

            // The API rejects an empty describe.
            if !page.items.is_empty() {
                for task in self.api.describe_tasks(cluster, &page.items).await? {
                    if task.health_status != TaskHealthStatus::Healthy {
                        warn!(
                            %cluster,
                            %service,
                            task = %task.arn,
                            status = %task.health_status,
                            "task is not healthy"
                        );
                        return Ok(TaskHealth::Unhealthy {
                            task: task.arn,
                            status: task.health_status,
                        });
                    }
                    healthy += 1;
                }
            }

            match page.next_token {
                Some(token) => {
                    debug!(%service, healthy, "fetching next task page");
                    page_token = Some(token);
                }
                None => break,
            }
        }

        info!(%cluster, %service, healthy, "tasks are healthy");
        Ok(TaskHealth::Healthy { count: healthy })
    }
}
