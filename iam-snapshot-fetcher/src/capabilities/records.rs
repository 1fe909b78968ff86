//! Plain records handed to the fetcher by the capability surfaces.
//!
//! Policy documents coming from IAM are still URL-encoded here; the fetcher decodes
//! and parses them only for resources it keeps.

use chrono::{DateTime, Utc};

use crate::model::Tags;

/// One page of a paginated listing. `next_marker` is `None` on the last page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page<T> {
    pub items: T,
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: T) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }

    pub fn with_marker(items: T, marker: impl Into<String>) -> Self {
        Self {
            items,
            next_marker: Some(marker.into()),
        }
    }
}

/// An inline policy as listed in authorization details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyDetail {
    pub name: String,
    pub document: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserDetail {
    pub name: String,
    pub path: String,
    pub groups: Vec<String>,
    pub attached_policy_arns: Vec<String>,
    pub inline_policies: Vec<PolicyDetail>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupDetail {
    pub name: String,
    pub path: String,
    pub attached_policy_arns: Vec<String>,
    pub inline_policies: Vec<PolicyDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleDetail {
    pub name: String,
    pub path: String,
    pub assume_role_policy_document: String,
    pub attached_policy_arns: Vec<String>,
    pub inline_policies: Vec<PolicyDetail>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersionRecord {
    pub version_id: String,
    pub document: String,
    pub is_default_version: bool,
    pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManagedPolicyDetail {
    pub name: String,
    pub path: String,
    pub arn: String,
    pub versions: Vec<PolicyVersionRecord>,
}

/// One page of GetAccountAuthorizationDetails, restricted to users, groups, roles and
/// customer managed policies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizationDetails {
    pub users: Vec<UserDetail>,
    pub groups: Vec<GroupDetail>,
    pub roles: Vec<RoleDetail>,
    pub policies: Vec<ManagedPolicyDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceProfileRecord {
    pub name: String,
    pub path: String,
    pub role_names: Vec<String>,
}

/// Role fields that the bulk listing leaves out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleDetails {
    pub description: Option<String>,
    pub max_session_duration: Option<i32>,
}

/// A bucket with its policy JSON (empty when it has none) and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketRecord {
    pub name: String,
    pub policy_json: String,
    pub tags: Tags,
}
