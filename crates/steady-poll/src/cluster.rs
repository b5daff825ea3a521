//! Cluster steady-state poller.
//!
//! Waits until every service in a set is simultaneously at capacity and
//! serving from healthy tasks. Services leave the pending set as they
//! converge; the set never grows.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use steady_core::{Clock, ClusterApi, Service, ServiceId};
use steady_health::{TaskHealth, TaskHealthChecker};

use crate::PollSettings;
use crate::error::{PollError, PollResult, join_ids};
use crate::events::{EVENT_DUMP_LIMIT, dump_events};
use crate::status::{PendingReason, ServiceStatus, check_capacity, check_events};

/// Polls a set of services until all of them reach a steady state.
#[derive(Clone)]
pub struct ClusterStatePoller {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    checker: TaskHealthChecker,
    settings: PollSettings,
}

impl ClusterStatePoller {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, settings: PollSettings) -> Self {
        Self {
            checker: TaskHealthChecker::new(api.clone()),
            api,
            clock,
            settings,
        }
    }

    /// Poll `services` in `cluster` until each is stable and healthy.
    ///
    /// With `staleness` set, a service whose newest event is older than the
    /// bound (measured from the start of this poll) is not evaluated on that
    /// iteration. Fails with [`PollError::Timeout`] once `timeout` has
    /// elapsed; `services` itself is never modified.
    pub async fn poll(
        &self,
        cluster: &str,
        services: &[ServiceId],
        timeout: Duration,
        staleness: Option<Duration>,
    ) -> PollResult<()> {
        info!(
            %cluster,
            services = %join_ids(services),
            timeout_secs = timeout.as_secs(),
            "polling services for steady state"
        );

        let start = self.clock.now();
        let mut pending: Vec<ServiceId> = Vec::with_capacity(services.len());
        for id in services {
            if !pending.contains(id) {
                pending.push(id.clone());
            }
        }
        let mut last_response: Vec<Service> = Vec::new();

        while !pending.is_empty() {
            self.clock.sleep(self.settings.interval).await;

            let elapsed = self.clock.elapsed_since(start);
            if elapsed > timeout {
                let events = dump_events(&last_response, EVENT_DUMP_LIMIT);
                return Err(PollError::Timeout {
                    target: format!("services in cluster {cluster}"),
                    pending,
                    events,
                    elapsed,
                });
            }

            let response = self.api.describe_services(cluster, &pending).await?;
            if response.is_empty() {
                warn!(%cluster, "describe_services returned no services");
                continue;
            }

            for service in &response {
                match self.evaluate(cluster, service, start, staleness).await? {
                    ServiceStatus::Converged => {
                        pending.retain(|id| id != &service.name);
                        info!(
                            %cluster,
                            service = %service.name,
                            elapsed_secs = self.clock.elapsed_since(start).as_secs(),
                            "service is in a steady state"
                        );
                    }
                    ServiceStatus::Pending(reason) => {
                        debug!(%cluster, service = %service.name, %reason, "service pending");
                    }
                }
            }
            for id in &pending {
                if !response.iter().any(|s| &s.name == id) {
                    let reason = PendingReason::Missing;
                    debug!(%cluster, service = %id, %reason, "service pending");
                }
            }
            last_response = response;
        }

        Ok(())
    }

    async fn evaluate(
        &self,
        cluster: &str,
        service: &Service,
        start: Duration,
        staleness: Option<Duration>,
    ) -> PollResult<ServiceStatus> {
        if let Some(bound) = staleness {
            if let Some(reason) = check_events(service, start, bound) {
                warn!(service = %service.name, %reason, "most recent event is stale");
                return Ok(ServiceStatus::Pending(reason));
            }
        }

        if let Some(reason) = check_capacity(service) {
            return Ok(ServiceStatus::Pending(reason));
        }

        // Nothing to run means nothing to verify.
        if !service.is_active() {
            return Ok(ServiceStatus::Converged);
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
