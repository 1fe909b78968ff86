//! AWS SDK integration: shared context and SDK-backed capability surfaces.

pub(crate) mod cloudformation;
pub mod context;
pub(crate) mod iam_client;
pub(crate) mod s3_client;
pub(crate) mod sts;

pub use cloudformation::CloudFormationOwnership;
pub use context::AwsContext;
pub use iam_client::AwsIamClient;
pub use s3_client::AwsS3Client;
pub use sts::StsIdentity;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error(
        "Error determining the AWS account id - check the AWS_REGION environment variable is set"
    )]
    MissingRegion,
    #[error("Identity resolution error: {0}")]
    IdentityError(String),
    #[error("IAM client error: {0}")]
    IamError(String),
    #[error("S3 client error: {0}")]
    S3Error(String),
    #[error("Tagging error: {0}")]
    TaggingError(String),
    #[error("Ownership lookup error: {0}")]
    OwnershipError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;
