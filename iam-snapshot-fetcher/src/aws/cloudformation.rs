//! CloudFormation-backed ownership index
//!
//! Walks every live stack in the account and records the physical ids of the IAM
//! and S3 resources it declares.

use async_trait::async_trait;
use aws_sdk_cloudformation::Client as CloudFormationClient;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, trace};

use crate::aws::{AwsError, AwsResult};
use crate::capabilities::OwnershipSource;
use crate::classifier::{OwnershipIndex, ResourceKind};

/// Concurrent ListStackResources walks.
const STACK_CONCURRENCY: usize = 4;

pub struct CloudFormationOwnership {
    client: CloudFormationClient,
}

impl CloudFormationOwnership {
    pub fn new(client: CloudFormationClient) -> Self {
        Self { client }
    }

    /// Names of stacks that still exist. DescribeStacks omits deleted stacks.
    async fn stack_names(&self) -> AwsResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .describe_stacks()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| {
                    AwsError::OwnershipError(format!("Failed to describe stacks: {e}"))
                })?;
            for stack in out.stacks() {
                let name: Option<&str> = stack.stack_name().into();
                names.extend(name.map(str::to_string));
            }
            match out.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(names)
    }

    async fn stack_resources(&self, stack_name: &str) -> AwsResult<Vec<(ResourceKind, String)>> {
        let mut resources = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_stack_resources()
                .stack_name(stack_name)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| {
                    AwsError::OwnershipError(format!(
                        "Failed to list resources of stack '{stack_name}': {e}"
                    ))
                })?;
            for summary in out.stack_resource_summaries() {
                let resource_type: Option<&str> = summary.resource_type().into();
                resources.extend(resource_type.and_then(|resource_type| {
                    managed_resource(resource_type, summary.physical_resource_id())
                }));
            }
            match out.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        trace!("Stack {stack_name}: {} tracked resources", resources.len());
        Ok(resources)
    }
}

#[async_trait]
impl OwnershipSource for CloudFormationOwnership {
    async fn populate(&self) -> AwsResult<OwnershipIndex> {
        let stacks = self.stack_names().await?;
        debug!("Indexing resources of {} CloudFormation stacks", stacks.len());

        let per_stack: Vec<Vec<(ResourceKind, String)>> = stream::iter(stacks)
            .map(|name: String| async move { self.stack_resources(&name).await })
            .buffer_unordered(STACK_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(per_stack.into_iter().flatten().collect())
    }
}

/// The index entry for one stack resource, if it is a kind the fetch classifies.
///
/// Managed policies report their ARN as the physical id; the fetch looks them up by name.
fn managed_resource(
    resource_type: &str,
    physical_id: Option<&str>,
) -> Option<(ResourceKind, String)> {
    let kind = ResourceKind::from_cloudformation_type(resource_type)?;
    let physical_id = physical_id.filter(|id| !id.is_empty())?;
    let identifier = match kind {
        ResourceKind::IamPolicy if physical_id.starts_with("arn:") => {
            physical_id.rsplit('/').next().unwrap_or(physical_id)
        }
        _ => physical_id,
    };
    Some((kind, identifier.to_string()))
}
