//! Shared AWS SDK configuration.

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::archive::GlacierArchive;
use crate::notification::SnsSqsNotifier;

/// Load the SDK configuration from the default credential chain, pinning the region when
/// one is configured.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Archive and notification clients built from one configuration load.
pub struct AwsServices {
    pub archive: GlacierArchive,
    pub notifier: SnsSqsNotifier,
}

impl AwsServices {
    pub async fn load(region: Option<&str>) -> Self {
        let config = load_sdk_config(region).await;
        tracing::debug!(region = ?config.region(), "AWS configuration loaded");
        Self {
            archive: GlacierArchive::new(&config),
            notifier: SnsSqsNotifier::new(&config),
        }
    }
}
