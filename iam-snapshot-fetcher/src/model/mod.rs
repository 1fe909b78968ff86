//! Resource model for an account snapshot.
//!
//! Every IAM resource is identified within its account by `(name, path)`. Those two
//! fields are not part of the serialized body: the configuration format keys each
//! resource file by its path and name instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::policy_document::PolicyDocument;

pub mod snapshot;

pub use snapshot::AccountSnapshot;

/// Resource tags, ordered by key so rendered output is stable.
pub type Tags = BTreeMap<String, String>;

/// The four accessors every resource exposes to build its ARN.
pub trait AwsResource {
    fn service(&self) -> &'static str {
        "iam"
    }
    fn resource_type(&self) -> &'static str;
    fn resource_name(&self) -> &str;
    fn resource_path(&self) -> &str;
}

macro_rules! iam_resource {
    ($ty:ty, $resource_type:literal) => {
        impl AwsResource for $ty {
            fn resource_type(&self) -> &'static str {
                $resource_type
            }

            fn resource_name(&self) -> &str {
                &self.name
            }

            fn resource_path(&self) -> &str {
                &self.path
            }
        }
    };
}

iam_resource!(User, "user");
iam_resource!(Group, "group");
iam_resource!(Role, "role");
iam_resource!(Policy, "policy");
iam_resource!(InstanceProfile, "instance-profile");

/// A policy embedded in exactly one user, group or role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub name: String,
    pub policy: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    /// Attached managed policies: bare names for this account's policies, full ARNs otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl User {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    /// Maximum session duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_duration: Option<i32>,
}

impl Role {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        assume_role_policy_document: PolicyDocument,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: None,
            assume_role_policy_document,
            inline_policies: Vec::new(),
            policies: Vec::new(),
            max_session_duration: None,
        }
    }
}

/// Version bookkeeping for a managed policy.
///
/// IAM caps the number of stored versions per policy, so anything that pushes a new
/// version needs to know which old version to delete first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionSummary {
    pub number_of_versions: usize,
    pub oldest_version_id: String,
    pub nondefault_version_ids: Vec<String>,
}

/// A customer managed policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(skip)]
    pub versions: VersionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub policy: PolicyDocument,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl Policy {
    pub fn new(name: impl Into<String>, path: impl Into<String>, policy: PolicyDocument) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            versions: VersionSummary::default(),
            description: None,
            policy,
            tags: Tags::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfile {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    /// Names of the roles in this profile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl InstanceProfile {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            roles: Vec::new(),
        }
    }
}

/// The resource policy attached to one S3 bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    #[serde(skip)]
    pub bucket_name: String,
    pub policy: PolicyDocument,
}

impl BucketPolicy {
    pub fn new(bucket_name: impl Into<String>, policy: PolicyDocument) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            policy,
        }
    }
}

impl AwsResource for BucketPolicy {
    fn service(&self) -> &'static str {
        "s3"
    }

    fn resource_type(&self) -> &'static str {
        ""
    }

    fn resource_name(&self) -> &str {
        &self.bucket_name
    }

    fn resource_path(&self) -> &str {
        "/"
    }
}
