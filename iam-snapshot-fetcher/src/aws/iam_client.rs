//! AWS IAM client wrapper for account enumeration and per-resource lookups

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_iam::primitives::DateTime as SdkDateTime;
use aws_sdk_iam::types::{self as iam, EntityType};
use aws_sdk_iam::Client as IamClient;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use log::trace;

use crate::aws::{AwsError, AwsResult};
use crate::capabilities::{
    AliasLister, AuthorizationDetails, GroupDetail, IamEnrichment, IamEnumeration,
    InstanceProfileRecord, ManagedPolicyDetail, Page, PolicyDetail, PolicyVersionRecord,
    RoleDetail, RoleDetails, TagLookup, UserDetail,
};
use crate::model::Tags;

/// Concurrent ListPolicyTags calls per batched lookup.
const TAG_LOOKUP_CONCURRENCY: usize = 8;

pub struct AwsIamClient {
    client: IamClient,
}

impl AwsIamClient {
    pub fn new(client: IamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AliasLister for AwsIamClient {
    async fn account_alias(&self) -> AwsResult<Option<String>> {
        let out = self
            .client
            .list_account_aliases()
            .send()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to list account aliases: {e}")))?;
        Ok(out.account_aliases().first().cloned())
    }
}

#[async_trait]
impl IamEnumeration for AwsIamClient {
    async fn authorization_details_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<AuthorizationDetails>> {
        let out = self
            .client
            .get_account_authorization_details()
            .filter(EntityType::User)
            .filter(EntityType::Group)
            .filter(EntityType::Role)
            .filter(EntityType::LocalManagedPolicy)
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!("Failed to get account authorization details: {e}"))
            })?;

        let details = AuthorizationDetails {
            users: out.user_detail_list().iter().map(user_detail).collect(),
            groups: out.group_detail_list().iter().map(group_detail).collect(),
            roles: out.role_detail_list().iter().map(role_detail).collect(),
            policies: out.policies().iter().map(managed_policy_detail).collect(),
        };
        trace!(
            "Authorization details page: {} users, {} groups, {} roles, {} policies",
            details.users.len(),
            details.groups.len(),
            details.roles.len(),
            details.policies.len()
        );

        Ok(Page {
            items: details,
            next_marker: next_marker(out.is_truncated(), out.marker()),
        })
    }

    async fn instance_profiles_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<Vec<InstanceProfileRecord>>> {
        let out = self
            .client
            .list_instance_profiles()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to list instance profiles: {e}")))?;

        Ok(Page {
            items: out.instance_profiles().iter().map(instance_profile).collect(),
            next_marker: next_marker(out.is_truncated(), out.marker()),
        })
    }
}

#[async_trait]
impl IamEnrichment for AwsIamClient {
    async fn policy_description(&self, policy_arn: &str) -> AwsResult<Option<String>> {
        let out = self
            .client
            .get_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!("Failed to get policy '{policy_arn}': {e}"))
            })?;
        Ok(out
            .policy()
            .and_then(iam::Policy::description)
            .map(str::to_string))
    }

    async fn role_details(&self, role_name: &str) -> AwsResult<RoleDetails> {
        let out = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to get role '{role_name}': {e}")))?;
        Ok(out.role().map(role_details).unwrap_or_default())
    }

    async fn policy_tags(&self, policy_arn: &str) -> AwsResult<Tags> {
        let mut tags = Tags::new();
        let mut marker = None;
        loop {
            let out = self
                .client
                .list_policy_tags()
                .policy_arn(policy_arn)
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| {
                    AwsError::TaggingError(format!(
                        "Failed to list tags for policy '{policy_arn}': {e}"
                    ))
                })?;
            tags.extend(tag_map(out.tags()));
            match next_marker(out.is_truncated(), out.marker()) {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(tags)
    }
}

#[async_trait]
impl TagLookup for AwsIamClient {
    async fn multiple_policy_tags(
        &self,
        policy_arns: &[String],
    ) -> AwsResult<HashMap<String, Tags>> {
        stream::iter(policy_arns.to_vec())
            .map(|arn: String| async move {
                let tags = self.policy_tags(&arn).await?;
                Ok::<_, AwsError>((arn, tags))
            })
            .buffer_unordered(TAG_LOOKUP_CONCURRENCY)
            .try_collect()
            .await
    }
}

fn next_marker(is_truncated: bool, marker: Option<&str>) -> Option<String> {
    if is_truncated {
        marker.map(str::to_string)
    } else {
        None
    }
}

fn tag_map(tags: &[iam::Tag]) -> Tags {
    tags.iter()
        .map(|t| (t.key().to_string(), t.value().to_string()))
        .collect()
}

fn attached_policy_arns(attached: &[iam::AttachedPolicy]) -> Vec<String> {
    attached
        .iter()
        .filter_map(iam::AttachedPolicy::policy_arn)
        .map(str::to_string)
        .collect()
}

fn inline_policies(policies: &[iam::PolicyDetail]) -> Vec<PolicyDetail> {
    policies
        .iter()
        .map(|p| PolicyDetail {
            name: p.policy_name().unwrap_or_default().to_string(),
            document: p.policy_document().unwrap_or_default().to_string(),
        })
        .collect()
}

fn to_utc(date: Option<&SdkDateTime>) -> DateTime<Utc> {
    date.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
        .unwrap_or_default()
}

fn user_detail(user: &iam::UserDetail) -> UserDetail {
    UserDetail {
        name: user.user_name().unwrap_or_default().to_string(),
        path: user.path().unwrap_or_default().to_string(),
        groups: user.group_list().to_vec(),
        attached_policy_arns: attached_policy_arns(user.attached_managed_policies()),
        inline_policies: inline_policies(user.user_policy_list()),
        tags: tag_map(user.tags()),
    }
}

fn group_detail(group: &iam::GroupDetail) -> GroupDetail {
    GroupDetail {
        name: group.group_name().unwrap_or_default().to_string(),
        path: group.path().unwrap_or_default().to_string(),
        attached_policy_arns: attached_policy_arns(group.attached_managed_policies()),
        inline_policies: inline_policies(group.group_policy_list()),
    }
}

fn role_detail(role: &iam::RoleDetail) -> RoleDetail {
    RoleDetail {
        name: role.role_name().unwrap_or_default().to_string(),
        path: role.path().unwrap_or_default().to_string(),
        assume_role_policy_document: role
            .assume_role_policy_document()
            .unwrap_or_default()
            .to_string(),
        attached_policy_arns: attached_policy_arns(role.attached_managed_policies()),
        inline_policies: inline_policies(role.role_policy_list()),
        tags: tag_map(role.tags()),
    }
}

fn managed_policy_detail(policy: &iam::ManagedPolicyDetail) -> ManagedPolicyDetail {
    ManagedPolicyDetail {
        name: policy.policy_name().unwrap_or_default().to_string(),
        path: policy.path().unwrap_or_default().to_string(),
        arn: policy.arn().unwrap_or_default().to_string(),
        versions: policy
            .policy_version_list()
            .iter()
            .map(|v| PolicyVersionRecord {
                version_id: v.version_id().unwrap_or_default().to_string(),
                document: v.document().unwrap_or_default().to_string(),
                is_default_version: v.is_default_version(),
                create_date: to_utc(v.create_date()),
            })
            .collect(),
    }
}

fn instance_profile(profile: &iam::InstanceProfile) -> InstanceProfileRecord {
    InstanceProfileRecord {
        name: profile.instance_profile_name().to_string(),
        path: profile.path().to_string(),
        role_names: profile
            .roles()
            .iter()
            .map(|r| r.role_name().to_string())
            .collect(),
    }
}

fn role_details(role: &iam::Role) -> RoleDetails {
    RoleDetails {
        description: role.description().map(str::to_string),
        max_session_duration: role.max_session_duration(),
    }
}
