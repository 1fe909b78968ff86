//! STS helpers for caller identity

use async_trait::async_trait;
use aws_sdk_sts::Client as StsClient;

use crate::aws::{AwsError, AwsResult};
use crate::capabilities::IdentityResolver;

/// Resolves the caller's account id with STS GetCallerIdentity.
pub struct StsIdentity {
    client: StsClient,
    region: Option<String>,
}

impl StsIdentity {
    pub fn new(client: StsClient, region: Option<String>) -> Self {
        Self { client, region }
    }
}

#[async_trait]
impl IdentityResolver for StsIdentity {
    async fn account_id(&self) -> AwsResult<String> {
        if self.region.as_deref().map_or(true, str::is_empty) {
            return Err(AwsError::MissingRegion);
        }

        let out = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| AwsError::IdentityError(format!("STS GetCallerIdentity failed: {e}")))?;
        out.account().map(str::to_string).ok_or_else(|| {
            AwsError::IdentityError("STS GetCallerIdentity missing Account".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sts::config::{BehaviorVersion, Region};

    fn client() -> StsClient {
        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        StsClient::from_conf(config)
    }

    #[tokio::test]
    async fn test_missing_region_fails_before_calling_sts() {
        let identity = StsIdentity::new(client(), None);
        let err = identity
            .account_id()
            .await
            .expect_err("no region configured");
        assert!(matches!(err, AwsError::MissingRegion));
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[tokio::test]
    async fn test_empty_region_is_missing() {
        let identity = StsIdentity::new(client(), Some(String::new()));
        assert!(matches!(
            identity.account_id().await,
            Err(AwsError::MissingRegion)
        ));
    }

    #[tokio::test]
    #[ignore = "requires AWS credentials"]
    async fn test_caller_account_id() {
        let ctx = crate::AwsContext::with_region("us-east-1").await;
        let identity = StsIdentity::new(ctx.sts_client(), Some("us-east-1".to_string()));
        let id = identity.account_id().await.expect("credentials available");
        assert_eq!(id.len(), 12);
    }
}
