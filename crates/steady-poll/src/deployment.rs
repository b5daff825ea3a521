//! Single-service deployment poller.
//!
//! Meant to run right after a service update: waits until the service's
//! primary deployment has rolled out completely and its tasks are healthy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use steady_core::{Clock, ClusterApi, Service, ServiceId};
use steady_health::{TaskHealth, TaskHealthChecker};

use crate::PollSettings;
use crate::error::{PollError, PollResult};
use crate::events::{EVENT_DUMP_LIMIT, dump_events};
use crate::status::{PendingReason, ServiceStatus, check_deployment};

/// Polls one service until its primary deployment is complete.
#[derive(Clone)]
pub struct DeploymentPoller {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    checker: TaskHealthChecker,
    settings: PollSettings,
}

impl DeploymentPoller {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, settings: PollSettings) -> Self {
        Self {
            checker: TaskHealthChecker::new(api.clone()),
            api,
            clock,
            settings,
        }
    }

    /// Poll `service` until its first deployment is `PRIMARY`, `COMPLETED`,
    /// at capacity, and all tasks are healthy.
    ///
    /// With `staleness` set, a deployment created longer than the bound
    /// before this poll started is not trusted to reflect the latest update.
    pub async fn poll(
        &self,
        cluster: &str,
        service: &ServiceId,
        timeout: Duration,
        staleness: Option<Duration>,
    ) -> PollResult<()> {
        info!(
            %cluster,
            %service,
            timeout_secs = timeout.as_secs(),
            "polling service deployment"
        );

        let start = self.clock.now();
        let mut last_response: Option<Service> = None;

        loop {
            self.clock.sleep(self.settings.interval).await;

            let elapsed = self.clock.elapsed_since(start);
            if elapsed > timeout {
                let events = dump_events(last_response.as_slice(), EVENT_DUMP_LIMIT);
                return Err(PollError::Timeout {
                    target: format!("deployment of {service} in cluster {cluster}"),
                    pending: vec![service.clone()],
                    events,
                    elapsed,
                });
            }

            let response = self
                .api
                .describe_services(cluster, std::slice::from_ref(service))
                .await?;
            let status = match response.into_iter().next() {
                Some(current) => {
                    let status = self.evaluate(cluster, &current, start, staleness).await?;
                    last_response = Some(current);
                    status
                }
                None => {
                    warn!(%cluster, %service, "describe_services returned no services");
                    ServiceStatus::Pending(PendingReason::Missing)
                }
            };

            match status {
                ServiceStatus::Converged => {
                    info!(
                        %cluster,
                        %service,
                        elapsed_secs = self.clock.elapsed_since(start).as_secs(),
                        "deploy is complete"
                    );
                    return Ok(());
                }
                ServiceStatus::Pending(reason) => {
                    debug!(%cluster, %service, %reason, "deployment pending");
                }
            }
        }
    }

    async fn evaluate(
        &self,
        cluster: &str,
        service: &Service,
        start: Duration,
        staleness: Option<Duration>,
    ) -> PollResult<ServiceStatus> {
        if let Some(reason) = check_deployment(service.primary_deployment(), start, staleness) {
            if matches!(reason, PendingReason::Stale { .. }) {
                warn!(service = %service.name, %reason, "deployment state info may be stale");
            }
            return Ok(ServiceStatus::Pending(reason));
        }

        match self.checker.check(cluster, &service.name).await? {
            TaskHealth::Healthy { .. } => Ok(ServiceStatus::Converged),
            TaskHealth::Unhealthy { task, .. } => {
                warn!(service = %service.name, "tasks are still not healthy");
                Ok(ServiceStatus::Pending(PendingReason::Unhealthy { task }))
            }
        }
    }
}
