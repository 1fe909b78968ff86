//! AWS S3 client wrapper for bucket policies and tags

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client as S3Client;
use futures::{stream, StreamExt, TryStreamExt};
use log::debug;

use crate::aws::{AwsError, AwsResult};
use crate::capabilities::{BucketRecord, S3Enumeration};
use crate::model::Tags;

/// Concurrent per-bucket lookups while listing.
const BUCKET_LOOKUP_CONCURRENCY: usize = 8;

const NO_SUCH_BUCKET_POLICY: &str = "NoSuchBucketPolicy";
const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";

/// Lists buckets and reads each bucket's policy and tags from its home region.
pub struct AwsS3Client {
    client: S3Client,
    config: Arc<SdkConfig>,
}

impl AwsS3Client {
    pub fn new(client: S3Client, config: Arc<SdkConfig>) -> Self {
        Self { client, config }
    }

    async fn bucket_names(&self) -> AwsResult<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation_token = None;
        loop {
            let out = self
                .client
                .list_buckets()
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| AwsError::S3Error(format!("Failed to list buckets: {e}")))?;
            names.extend(
                out.buckets()
                    .iter()
                    .filter_map(|b| b.name())
                    .map(str::to_string),
            );
            match out.continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn regional_client(&self, bucket: &str) -> AwsResult<S3Client> {
        let out = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                AwsError::S3Error(format!("Failed to get location of bucket '{bucket}': {e}"))
            })?;
        let region = bucket_region(out.location_constraint().map(|c| c.as_str()));
        let config = aws_sdk_s3::config::Builder::from(self.config.as_ref())
            .region(Region::new(region))
            .build();
        Ok(S3Client::from_conf(config))
    }

    async fn bucket_record(&self, name: String) -> AwsResult<BucketRecord> {
        let client = self.regional_client(&name).await?;
        let policy_json = bucket_policy(&client, &name).await?;
        // Tags only matter for buckets that will be classified.
        let tags = if policy_json.is_empty() {
            Tags::new()
        } else {
            bucket_tags(&client, &name).await?
        };
        Ok(BucketRecord {
            name,
            policy_json,
            tags,
        })
    }
}

#[async_trait]
impl S3Enumeration for AwsS3Client {
    async fn list_all_buckets(&self) -> AwsResult<Vec<BucketRecord>> {
        let names = self.bucket_names().await?;
        debug!("Reading policies for {} buckets", names.len());
        stream::iter(names)
            .map(|name| self.bucket_record(name))
            .buffered(BUCKET_LOOKUP_CONCURRENCY)
            .try_collect()
            .await
    }
}

/// Map a GetBucketLocation constraint to a region name. Buckets in us-east-1 report no
/// constraint and old eu-west-1 buckets report `EU`.
fn bucket_region(location_constraint: Option<&str>) -> String {
    match location_constraint {
        None | Some("") => "us-east-1".to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

async fn bucket_policy(client: &S3Client, bucket: &str) -> AwsResult<String> {
    match client.get_bucket_policy().bucket(bucket).send().await {
        Ok(out) => Ok(out.policy().unwrap_or_default().to_string()),
        Err(e) if e.code() == Some(NO_SUCH_BUCKET_POLICY) => Ok(String::new()),
        Err(e) => Err(AwsError::S3Error(format!(
            "Failed to get policy of bucket '{bucket}': {e}"
        ))),
    }
}

async fn bucket_tags(client: &S3Client, bucket: &str) -> AwsResult<Tags> {
    match client.get_bucket_tagging().bucket(bucket).send().await {
        Ok(out) => Ok(out
            .tag_set()
            .iter()
            .map(|t| (t.key().to_string(), t.value().to_string()))
            .collect()),
        Err(e) if e.code() == Some(NO_SUCH_TAG_SET) => Ok(Tags::new()),
        Err(e) => Err(AwsError::TaggingError(format!(
            "Failed to get tags of bucket '{bucket}': {e}"
        ))),
    }
}
