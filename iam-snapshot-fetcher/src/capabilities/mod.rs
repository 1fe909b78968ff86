//! Capability surfaces the fetcher depends on.
//!
//! Each external lookup sits behind a small async trait so that the fetch pipeline can
//! run against the AWS SDK adapters in [`crate::aws`] or against in-memory doubles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::aws::AwsResult;
use crate::classifier::OwnershipIndex;
use crate::model::Tags;

pub mod records;

pub use records::{
    AuthorizationDetails, BucketRecord, GroupDetail, InstanceProfileRecord, ManagedPolicyDetail,
    Page, PolicyDetail, PolicyVersionRecord, RoleDetail, RoleDetails, UserDetail,
};

/// Resolves the id of the account the credentials belong to.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Fails with [`crate::AwsError::MissingRegion`] when no region is configured.
    async fn account_id(&self) -> AwsResult<String>;
}

#[async_trait]
pub trait AliasLister: Send + Sync {
    /// The account alias, if one is set. Accounts carry at most one.
    async fn account_alias(&self) -> AwsResult<Option<String>>;
}

/// Paginated IAM listings. Pass `None` for the first page, then each page's
/// `next_marker` until it is `None`.
#[async_trait]
pub trait IamEnumeration: Send + Sync {
    async fn authorization_details_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<AuthorizationDetails>>;

    async fn instance_profiles_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<Vec<InstanceProfileRecord>>>;
}

/// Per-resource lookups for fields the bulk listing omits.
#[async_trait]
pub trait IamEnrichment: Send + Sync {
    async fn policy_description(&self, policy_arn: &str) -> AwsResult<Option<String>>;

    async fn role_details(&self, role_name: &str) -> AwsResult<RoleDetails>;

    async fn policy_tags(&self, policy_arn: &str) -> AwsResult<Tags>;
}

#[async_trait]
pub trait TagLookup: Send + Sync {
    /// Tags for many policies in one call, keyed by policy ARN. Policies without tags
    /// may be missing from the result.
    async fn multiple_policy_tags(&self, policy_arns: &[String])
        -> AwsResult<HashMap<String, Tags>>;
}

#[async_trait]
pub trait S3Enumeration: Send + Sync {
    async fn list_all_buckets(&self) -> AwsResult<Vec<BucketRecord>>;
}

/// Builds the index of resources owned by infrastructure-as-code stacks.
#[async_trait]
pub trait OwnershipSource: Send + Sync {
    async fn populate(&self) -> AwsResult<OwnershipIndex>;
}

/// An ownership source that knows of no managed resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOwnershipSource;

#[async_trait]
impl OwnershipSource for NoOwnershipSource {
    async fn populate(&self) -> AwsResult<OwnershipIndex> {
        Ok(OwnershipIndex::default())
    }
}

/// The full set of capability clients a fetch runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub identity: Arc<dyn IdentityResolver>,
    pub aliases: Arc<dyn AliasLister>,
    pub iam: Arc<dyn IamEnumeration>,
    pub enrichment: Arc<dyn IamEnrichment>,
    pub tagging: Arc<dyn TagLookup>,
    pub s3: Arc<dyn S3Enumeration>,
    pub ownership: Arc<dyn OwnershipSource>,
}

impl Capabilities {
    /// Use one provider for every surface except ownership, which defaults to
    /// [`NoOwnershipSource`].
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: IdentityResolver
            + AliasLister
            + IamEnumeration
            + IamEnrichment
            + TagLookup
            + S3Enumeration
            + 'static,
    {
        Self {
            identity: provider.clone(),
            aliases: provider.clone(),
            iam: provider.clone(),
            enrichment: provider.clone(),
            tagging: provider.clone(),
            s3: provider,
            ownership: Arc::new(NoOwnershipSource),
        }
    }

    pub fn with_ownership(mut self, ownership: Arc<dyn OwnershipSource>) -> Self {
        self.ownership = ownership;
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
