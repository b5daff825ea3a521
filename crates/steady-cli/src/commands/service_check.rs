use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use steady_core::{ClusterApi, ServiceId, SteadyConfig, SystemClock};
use steady_poll::{DeploymentPoller, PollSettings};

pub async fn run(
    api: Arc<dyn ClusterApi>,
    config: &SteadyConfig,
    cluster: &str,
    service: &str,
    stale_s: Option<u64>,
    timeout_s: Option<u64>,
) -> anyhow::Result<()> {
    let service = ServiceId::normalize(service);
    let timeout = timeout_s
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.service_check_timeout());
    let stale = stale_s
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.stale_after());

    let poller = DeploymentPoller::new(
        api,
        Arc::new(SystemClock),
        PollSettings::from_config(config),
    );
    poller
        .poll(cluster, &service, timeout, Some(stale))
        .await
        .with_context(|| format!("service {service} did not reach a steady state"))?;

    println!("✓ {service} deployment complete");
    Ok(())
}
