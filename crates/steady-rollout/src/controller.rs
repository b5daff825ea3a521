//! Rolling replacer — drives each batch through drain, terminate, verify.
//!
//! The replacer never assumes exclusive access to the cluster: every
//! decision is made from a fresh describe, and its only local state is the
//! set of instances in the current batch still waiting to be terminated.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use steady_core::{Clock, ClusterApi, ContainerInstance, InstanceStatus, ServiceId};
use steady_poll::ClusterStatePoller;

use crate::batch::{Batch, plan_batches};
use crate::error::{RolloutError, RolloutResult};
use crate::strategy::{ReplaceOptions, ReplaceSettings};

/// Progress of a single batch. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// Not started.
    Pending,
    /// DRAINING issued; waiting for tasks to move off.
    Draining,
    /// Every instance terminated; waiting for the cluster to settle.
    Terminating,
    /// Cluster back in a steady state.
    Verified,
    /// Every instance already on the target AMI.
    Skipped,
}

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub phase: BatchPhase,
    /// Instances left alone because they already run the target AMI.
    pub up_to_date: Vec<String>,
    /// Instances terminated, in termination order.
    pub terminated: Vec<String>,
}

impl BatchReport {
    fn new(index: usize) -> Self {
        Self {
            index,
            phase: BatchPhase::Pending,
            up_to_date: Vec::new(),
            terminated: Vec::new(),
        }
    }

    fn advance(&mut self, phase: BatchPhase) {
        debug_assert!(phase > self.phase, "batch phases only move forward");
        debug!(batch = self.index, from = ?self.phase, to = ?phase, "batch phase");
        self.phase = phase;
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub cluster: String,
    pub instances: usize,
    pub batches: Vec<BatchReport>,
    pub elapsed_secs: u64,
}

impl ReplaceSummary {
    pub fn terminated(&self) -> usize {
        self.batches.iter().map(|b| b.terminated.len()).sum()
    }
}

/// Instances of one batch, sorted by what to do with them.
#[derive(Debug, Default)]
struct BatchPlan {
    /// Receive the DRAINING transition.
    to_drain: Vec<ContainerInstance>,
    /// Already draining: no transition, still awaited for termination.
    already_draining: Vec<ContainerInstance>,
    /// On the target AMI: never drained or terminated.
    up_to_date: Vec<ContainerInstance>,
}

impl BatchPlan {
    fn classify(
        instances: Vec<ContainerInstance>,
        target_ami: Option<&str>,
    ) -> RolloutResult<Self> {
        let mut plan = Self::default();
        for instance in instances {
            if instance.status == InstanceStatus::Draining {
                warn!(instance = %instance.id, "instance was already draining");
                plan.already_draining.push(instance);
                continue;
            }

            if let Some(target) = target_ami {
                let Some(ami) = instance.ami_id.as_deref() else {
                    return Err(RolloutError::Precondition(format!(
                        "no ami id found for instance {}",
                        instance.id
                    )));
                };
                if ami == target {
                    warn!(instance = %instance.id, %ami, "instance already uses target ami, skipping");
                    plan.up_to_date.push(instance);
                    continue;
                }
            }

            info!(
                instance = %instance.id,
                ami = instance.ami_id.as_deref().unwrap_or("unknown"),
                "instance to drain"
            );
            plan.to_drain.push(instance);
        }
        Ok(plan)
    }

    /// Instances this batch must see terminated.
    fn awaiting(&self) -> Vec<ContainerInstance> {
        self.to_drain
            .iter()
            .chain(&self.already_draining)
            .cloned()
            .collect()
    }
}

/// Batched drain-and-terminate of a cluster's container instances.
pub struct RollingReplacer {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    poller: ClusterStatePoller,
    settings: ReplaceSettings,
}

impl RollingReplacer {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, settings: ReplaceSettings) -> Self {
        Self {
            poller: ClusterStatePoller::new(api.clone(), clock.clone(), settings.poll),
            api,
            clock,
            settings,
        }
    }

    /// Replace every container instance in `cluster`, batch by batch.
    ///
    /// Any error aborts the run immediately. Batches already processed stay
    /// replaced; call again once the cause is fixed.
    pub async fn rolling_replace(
        &self,
        cluster: &str,
        options: &ReplaceOptions,
    ) -> RolloutResult<ReplaceSummary> {
        let started = self.clock.now();

        let services = self.api.list_services(cluster).await?;
        if services.is_empty() {
            return Err(RolloutError::Precondition(format!(
                "no services found in cluster {cluster}"
            )));
        }

        info!(%cluster, services = services.len(), "checking services are stable");
        self.poller
            .poll(cluster, &services, self.settings.precheck_timeout, None)
            .await?;

        let instance_arns = self.list_instance_arns(cluster).await?;
        let instances = instance_arns.len();
        let batches = plan_batches(instance_arns, options.batches, options.force)?;
        info!(%cluster, instances, batches = batches.len(), "starting rolling replacement");

        let mut reports = Vec::with_capacity(batches.len());
        for batch in &batches {
            let report = self.replace_batch(cluster, batch, &services, options).await?;
            reports.push(report);
        }

        let elapsed_secs = self.clock.elapsed_since(started).as_secs();
        info!(%cluster, elapsed_secs, "instance replacement complete");

        Ok(ReplaceSummary {
            cluster: cluster.to_string(),
            instances,
            batches: reports,
            elapsed_secs,
        })
    }

    async fn list_instance_arns(&self, cluster: &str) -> RolloutResult<Vec<String>> {
        let mut arns = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .api
                .list_container_instances(cluster, page_token.as_deref())
                .await?;
            arns.extend(page.items);
            match page.next_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(arns)
    }

    async fn replace_batch(
        &self,
        cluster: &str,
        batch: &Batch,
        services: &[ServiceId],
        options: &ReplaceOptions,
    ) -> RolloutResult<BatchReport> {
        let mut report = BatchReport::new(batch.index);
        info!(%cluster, batch = batch.index, instances = batch.instance_arns.len(), "starting batch");

        let described = self
            .api
            .describe_container_instances(cluster, &batch.instance_arns)
            .await?;
        if described.is_empty() {
            return Err(RolloutError::Precondition(format!(
                "no container instances found for batch {}",
                batch.index
            )));
        }

        let plan = BatchPlan::classify(described, options.target_ami.as_deref())?;
        report.up_to_date = plan.up_to_date.iter().map(|i| i.id.clone()).collect();

        let awaiting = plan.awaiting();
        if awaiting.is_empty() {
            info!(batch = batch.index, "every instance already up to date, skipping batch");
            report.advance(BatchPhase::Skipped);
            return Ok(report);
        }

        if !plan.to_drain.is_empty() {
            let arns: Vec<String> = plan.to_drain.iter().map(|i| i.arn.clone()).collect();
            self.api
                .update_container_instances_state(cluster, &arns, InstanceStatus::Draining)
                .await?;
        }
        report.advance(BatchPhase::Draining);

        info!(
            batch = batch.index,
            timeout_secs = options.drain_timeout.as_secs(),
            "waiting for drain to complete"
        );
        self.drain_and_terminate(cluster, batch.index, awaiting, options.drain_timeout, &mut report)
            .await?;
        report.advance(BatchPhase::Terminating);

        // Replacement capacity can take a while to come into service.
        self.poller
            .poll(cluster, services, options.drain_timeout, None)
            .await?;
        report.advance(BatchPhase::Verified);

        Ok(report)
    }

    /// Terminate each awaited instance once it reports no running tasks.
    async fn drain_and_terminate(
        &self,
        cluster: &str,
        batch: usize,
        mut awaiting: Vec<ContainerInstance>,
        drain_timeout: Duration,
        report: &mut BatchReport,
    ) -> RolloutResult<()> {
        let start = self.clock.now();

        while !awaiting.is_empty() {
            if self.clock.elapsed_since(start) > drain_timeout {
                return Err(RolloutError::DrainTimeout {
                    batch,
                    pending: awaiting.into_iter().map(|i| i.id).collect(),
                    timeout: drain_timeout,
                });
            }
            self.clock.sleep(self.settings.poll.interval).await;

            let arns: Vec<String> = awaiting.iter().map(|i| i.arn.clone()).collect();
            let current = self.api.describe_container_instances(cluster, &arns).await?;
            for instance in current {
                if instance.running_tasks_count > 0 {
                    debug!(
                        instance = %instance.id,
                        running_tasks = instance.running_tasks_count,
                        "still draining"
                    );
                    continue;
                }
                let Some(pos) = awaiting.iter().position(|i| i.arn == instance.arn) else {
                    continue;
                };
                info!(instance = %instance.id, "instance is drained, terminating");
                self.api
                    .terminate_instances(std::slice::from_ref(&instance.id))
                    .await?;
                awaiting.swap_remove(pos);
                report.terminated.push(instance.id);
            }
        }

        Ok(())
    }
}
