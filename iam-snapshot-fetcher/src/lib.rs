//! This crate builds an in-memory snapshot of an AWS account's IAM configuration:
//! - Account identity and ARN construction
//! - Ownership classification (tags, path prefixes, infrastructure-managed resources)
//! - Concurrent fetching of IAM resources and S3 bucket policies
//!
//! External lookups go through the capability traits in [`capabilities`]. The SDK-backed
//! implementations are created from an [`AwsContext`].

mod account;
mod aws;
pub mod capabilities;
mod classifier;
mod config;
mod error;
mod fetch;
mod model;
mod policy_document;

// Re-exports for a small, focused public API
pub use account::Account;
pub use aws::{
    AwsContext, AwsError, AwsIamClient, AwsResult, AwsS3Client, CloudFormationOwnership,
    StsIdentity,
};
pub use capabilities::{Capabilities, NoOwnershipSource};
pub use classifier::{Decision, OwnershipClassifier, OwnershipIndex, ResourceKind, SkipReason};
pub use config::FetchOptions;
pub use error::{FetchPhase, SnapshotError, SnapshotResult};
pub use fetch::Fetcher;
pub use model::{
    AccountSnapshot, AwsResource, BucketPolicy, Group, InlinePolicy, InstanceProfile, Policy,
    Role, Tags, User, VersionSummary,
};
pub use policy_document::PolicyDocument;

/// Fetch a snapshot of the account the default AWS configuration points at.
pub async fn fetch_account(options: FetchOptions) -> SnapshotResult<AccountSnapshot> {
    let context = AwsContext::new().await;
    Fetcher::new(options, context.capabilities()).fetch().await
}
