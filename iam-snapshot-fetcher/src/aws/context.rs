//! Shared AWS configuration context
//!
//! `AwsContext` loads the SDK configuration once and builds every client a fetch
//! needs from it.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::aws::{AwsIamClient, AwsS3Client, CloudFormationOwnership, StsIdentity};
use crate::capabilities::Capabilities;

/// Shared AWS configuration for the IAM, STS, S3 and CloudFormation clients.
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
}

impl AwsContext {
    /// Load configuration from the environment, config files and instance roles.
    ///
    /// The region may be left unset; the fetch then fails while resolving the account.
    pub async fn new() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_sdk_config(config)
    }

    /// Load configuration with an explicit region.
    pub async fn with_region(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_sdk_config(config)
    }

    pub fn from_sdk_config(config: SdkConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// The configured region, if any.
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    pub fn iam_client(&self) -> aws_sdk_iam::Client {
        aws_sdk_iam::Client::new(self.sdk_config())
    }

    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }

    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(self.sdk_config())
    }

    pub fn cloudformation_client(&self) -> aws_sdk_cloudformation::Client {
        aws_sdk_cloudformation::Client::new(self.sdk_config())
    }

    /// SDK-backed capabilities for a fetch, with stack ownership read from CloudFormation.
    pub fn capabilities(&self) -> Capabilities {
        let iam = Arc::new(AwsIamClient::new(self.iam_client()));
        Capabilities {
            identity: Arc::new(StsIdentity::new(
                self.sts_client(),
                self.region().map(str::to_string),
            )),
            aliases: iam.clone(),
            iam: iam.clone(),
            enrichment: iam.clone(),
            tagging: iam,
            s3: Arc::new(AwsS3Client::new(self.s3_client(), Arc::clone(&self.config))),
            ownership: Arc::new(CloudFormationOwnership::new(self.cloudformation_client())),
        }
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}
