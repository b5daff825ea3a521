pub mod current_image;
pub mod rolling_replace;
pub mod service_check;

use std::sync::Arc;

use clap::ValueEnum;
use tracing::info;

use steady_aws::{AwsClusterApi, AwsSettings};
use steady_core::{ClusterApi, SteadyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Resolve AWS settings. Flags win over `[aws]` in the config file.
pub fn aws_settings(
    config: &SteadyConfig,
    region: Option<String>,
    endpoint_url: Option<String>,
) -> AwsSettings {
    let mut settings = AwsSettings::from_config(config);
    if region.is_some() {
        settings.region = region;
    }
    if endpoint_url.is_some() {
        settings.endpoint_url = endpoint_url;
    }
    info!(
        region = settings.region.as_deref().unwrap_or("default chain"),
        endpoint_url = settings.endpoint_url.as_deref().unwrap_or("default"),
        "resolved aws settings"
    );
    settings
}

pub async fn connect(
    config: &SteadyConfig,
    region: Option<String>,
    endpoint_url: Option<String>,
) -> Arc<dyn ClusterApi> {
    let settings = aws_settings(config, region, endpoint_url);
    Arc::new(AwsClusterApi::connect(&settings).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use steady_core::config::AwsConfig;

    #[test]
    fn flags_override_aws_config() {
        let config = SteadyConfig {
            aws: Some(AwsConfig {
                region: Some("eu-west-1".into()),
                endpoint_url: Some("http://localhost:4566".into()),
            }),
            ..SteadyConfig::default()
        };

        let settings = aws_settings(&config, Some("us-east-1".into()), None);
        assert_eq!(settings.region.as_deref(), Some("us-east-1"));
        assert_eq!(settings.endpoint_url.as_deref(), Some("http://localhost:4566"));

        let defaults = aws_settings(&SteadyConfig::default(), None, None);
        assert!(defaults.region.is_none());
        assert!(defaults.endpoint_url.is_none());
    }
}
