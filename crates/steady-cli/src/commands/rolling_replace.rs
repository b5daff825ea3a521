use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use steady_core::{ClusterApi, SteadyConfig, SystemClock};
use steady_rollout::{BatchPhase, ReplaceOptions, ReplaceSettings, ReplaceSummary, RollingReplacer};

use super::OutputFormat;

/// Merge flags over the config file.
pub fn options(
    config: &SteadyConfig,
    batches: Option<u32>,
    ami_id: Option<String>,
    drain_timeout_s: Option<u64>,
    force: bool,
) -> ReplaceOptions {
    ReplaceOptions {
        batches: batches.unwrap_or_else(|| config.batches()),
        target_ami: ami_id,
        force,
        drain_timeout: drain_timeout_s
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.drain_timeout()),
    }
}

pub async fn run(
    api: Arc<dyn ClusterApi>,
    config: &SteadyConfig,
    cluster: &str,
    options: &ReplaceOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let replacer = RollingReplacer::new(
        api,
        Arc::new(SystemClock),
        ReplaceSettings::from_config(config),
    );
    let summary = replacer
        .rolling_replace(cluster, options)
        .await
        .with_context(|| format!("rolling replacement of cluster {cluster} failed"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", format_summary(&summary)),
    }
    Ok(())
}

pub fn format_summary(summary: &ReplaceSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "✓ Replaced {} of {} instances in {} ({} batches, {}s)",
        summary.terminated(),
        summary.instances,
        summary.cluster,
        summary.batches.len(),
        summary.elapsed_secs,
    );
    for batch in &summary.batches {
        let phase = match batch.phase {
            BatchPhase::Skipped => "skipped",
            BatchPhase::Verified => "verified",
            BatchPhase::Pending | BatchPhase::Draining | BatchPhase::Terminating => "incomplete",
        };
        let _ = write!(out, "  batch {}: {phase}", batch.index);
        if !batch.terminated.is_empty() {
            let _ = write!(out, ", terminated {}", batch.terminated.join(", "));
        }
        if !batch.up_to_date.is_empty() {
            let _ = write!(out, ", up to date {}", batch.up_to_date.join(", "));
        }
        out.push('\n');
    }
    out
}
