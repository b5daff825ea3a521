use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use steady_core::SteadyConfig;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "steady",
    about = "Wait for ECS services to settle and roll cluster instances safely",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Configuration file (default: ./steady.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the AWS endpoint, e.g. for a local emulator
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a service deployment to complete with healthy tasks
    ServiceCheck {
        /// Service name or ARN
        service: String,
        #[arg(long)]
        cluster_name: String,
        #[arg(long)]
        region: Option<String>,
        /// Ignore deployments created more than this many seconds before the check
        #[arg(long)]
        stale_s: Option<u64>,
        #[arg(long)]
        timeout_s: Option<u64>,
    },
    /// Drain and terminate every container instance, batch by batch.
    ///
    /// The cluster must be in a steady state before the first batch and
    /// returns to one after each batch. Replacement capacity is expected
    /// to come from the instances' auto scaling group.
    RollingReplace {
        #[arg(long)]
        cluster_name: String,
        #[arg(long)]
        region: Option<String>,
        /// Number of batches to split the fleet into
        #[arg(long)]
        batches: Option<u32>,
        /// Leave instances already running this AMI alone
        #[arg(long)]
        ami_id: Option<String>,
        /// Seconds to wait for a batch to drain, and to settle afterwards
        #[arg(long)]
        drain_timeout_s: Option<u64>,
        /// Allow a single batch to replace the whole fleet
        #[arg(long)]
        force: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the image of a service's first container
    CurrentImage {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        region: Option<String>,
    },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "info,steady=debug"
    } else {
        "info,steady=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose)?;

    let config = SteadyConfig::load(cli.global.config.as_deref())
        .context("failed to load configuration")?;
    debug!(
        poll_interval_secs = config.poll_interval().as_secs(),
        batches = config.batches(),
        drain_timeout_secs = config.drain_timeout().as_secs(),
        "resolved configuration"
    );
    let endpoint_url = cli.global.endpoint_url;

    match cli.command {
        Commands::ServiceCheck {
            service,
            cluster_name,
            region,
            stale_s,
            timeout_s,
        } => {
            let api = commands::connect(&config, region, endpoint_url).await;
            commands::service_check::run(
                api,
                &config,
                &cluster_name,
                &service,
                stale_s,
                timeout_s,
            )
            .await
        }
        Commands::RollingReplace {
            cluster_name,
            region,
            batches,
            ami_id,
            drain_timeout_s,
            force,
            format,
        } => {
            let api = commands::connect(&config, region, endpoint_url).await;
            let options = commands::rolling_replace::options(
                &config,
                batches,
                ami_id,
                drain_timeout_s,
                force,
            );
            commands::rolling_replace::run(api, &config, &cluster_name, &options, format).await
        }
        Commands::CurrentImage {
            cluster,
            service,
            region,
        } => {
            let api = commands::connect(&config, region, endpoint_url).await;
            commands::current_image::run(api.as_ref(), &cluster, &service).await
        }
    }
}
