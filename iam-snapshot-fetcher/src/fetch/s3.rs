//! S3 fetch task: bucket policies.

use std::sync::Arc;

use log::debug;

use crate::capabilities::S3Enumeration;
use crate::classifier::{OwnershipClassifier, ResourceKind};
use crate::error::SnapshotResult;
use crate::model::BucketPolicy;
use crate::policy_document::PolicyDocument;

/// Buckets have no IAM path; this placeholder never matches a skip prefix.
const BUCKET_PLACEHOLDER_PATH: &str = "__DONTSKIPS3__";

pub(crate) async fn fetch_s3_data(
    s3: Arc<dyn S3Enumeration>,
    classifier: Arc<OwnershipClassifier>,
) -> SnapshotResult<Vec<BucketPolicy>> {
    let buckets = s3.list_all_buckets().await?;
    debug!("Listed {} buckets", buckets.len());

    let mut bucket_policies = Vec::new();
    for bucket in buckets {
        if bucket.policy_json.is_empty() {
            continue;
        }
        if classifier.should_skip(
            ResourceKind::S3Bucket,
            &bucket.name,
            &bucket.tags,
            BUCKET_PLACEHOLDER_PATH,
        ) {
            continue;
        }

        let policy = PolicyDocument::from_json(&bucket.policy_json)?;
        bucket_policies.push(BucketPolicy::new(bucket.name, policy));
    }

    Ok(bucket_policies)
}
