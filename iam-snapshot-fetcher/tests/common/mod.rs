//! In-memory capability doubles for fetch tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use iam_snapshot_fetcher::capabilities::{
    AliasLister, AuthorizationDetails, BucketRecord, IamEnrichment, IamEnumeration,
    IdentityResolver, InstanceProfileRecord, ManagedPolicyDetail, OwnershipSource, Page,
    PolicyDetail, PolicyVersionRecord, RoleDetail, RoleDetails, S3Enumeration, TagLookup,
    UserDetail,
};
use iam_snapshot_fetcher::{AwsError, AwsResult, Capabilities, OwnershipIndex, Tags};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub const ACCOUNT_ID: &str = "123456789012";
pub const TRUST_POLICY: &str =
    r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":"ec2.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;

/// A fake account. Auth detail and instance profile pages are served in order, with
/// the page index as the marker.
#[derive(Default)]
pub struct FakeAccount {
    pub missing_region: bool,
    pub alias: Option<String>,
    pub auth_pages: Vec<AuthorizationDetails>,
    pub instance_profile_pages: Vec<Vec<InstanceProfileRecord>>,
    pub policy_descriptions: HashMap<String, String>,
    pub role_details: HashMap<String, RoleDetails>,
    pub policy_tags: HashMap<String, Tags>,
    pub buckets: Vec<BucketRecord>,
    pub fail_alias: bool,
    pub fail_iam_listing: bool,
    pub fail_instance_profiles_at: Option<usize>,
    pub fail_tag_lookup: bool,
    pub fail_s3_listing: bool,
    pub fail_role_details_for: Option<String>,
    pub auth_markers_seen: Mutex<Vec<Option<String>>>,
    pub instance_profile_markers_seen: Mutex<Vec<Option<String>>>,
    pub lookups_started: AtomicUsize,
    pub lookups_finished: AtomicUsize,
}

impl FakeAccount {
    pub fn lookups_started(&self) -> usize {
        self.lookups_started.load(Ordering::SeqCst)
    }

    pub fn lookups_finished(&self) -> usize {
        self.lookups_finished.load(Ordering::SeqCst)
    }

    pub fn auth_markers_seen(&self) -> Vec<Option<String>> {
        self.auth_markers_seen
            .lock()
            .expect("marker lock")
            .clone()
    }

    pub fn instance_profile_markers_seen(&self) -> Vec<Option<String>> {
        self.instance_profile_markers_seen
            .lock()
            .expect("marker lock")
            .clone()
    }
}

pub fn capabilities(fake: &Arc<FakeAccount>) -> Capabilities {
    Capabilities::from_provider(Arc::clone(fake))
}

fn serve_page<T: Clone + Default>(
    pages: &[T],
    marker: Option<String>,
    seen: &Mutex<Vec<Option<String>>>,
) -> Page<T> {
    seen.lock().expect("marker lock").push(marker.clone());
    let index = marker
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or_default();
    let items = pages.get(index).cloned().unwrap_or_default();
    if index + 1 < pages.len() {
        Page::with_marker(items, (index + 1).to_string())
    } else {
        Page::last(items)
    }
}

#[async_trait]
impl IdentityResolver for FakeAccount {
    async fn account_id(&self) -> AwsResult<String> {
        if self.missing_region {
            return Err(AwsError::MissingRegion);
        }
        Ok(ACCOUNT_ID.to_string())
    }
}

#[async_trait]
impl AliasLister for FakeAccount {
    async fn account_alias(&self) -> AwsResult<Option<String>> {
        if self.fail_alias {
            return Err(AwsError::IamError("ListAccountAliases denied".to_string()));
        }
        Ok(self.alias.clone())
    }
}

#[async_trait]
impl IamEnumeration for FakeAccount {
    async fn authorization_details_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<AuthorizationDetails>> {
        if self.fail_iam_listing {
            return Err(AwsError::IamError("listing denied".to_string()));
        }
        Ok(serve_page(&self.auth_pages, marker, &self.auth_markers_seen))
    }

    async fn instance_profiles_page(
        &self,
        marker: Option<String>,
    ) -> AwsResult<Page<Vec<InstanceProfileRecord>>> {
        let index = marker.as_deref().and_then(|m| m.parse::<usize>().ok());
        if self.fail_instance_profiles_at == Some(index.unwrap_or_default()) {
            self.instance_profile_markers_seen
                .lock()
                .expect("marker lock")
                .push(marker);
            return Err(AwsError::IamError("ListInstanceProfiles denied".to_string()));
        }
        Ok(serve_page(
            &self.instance_profile_pages,
            marker,
            &self.instance_profile_markers_seen,
        ))
    }
}

#[async_trait]
impl IamEnrichment for FakeAccount {
    async fn policy_description(&self, policy_arn: &str) -> AwsResult<Option<String>> {
        self.lookups_started.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let description = self.policy_descriptions.get(policy_arn).cloned();
        self.lookups_finished.fetch_add(1, Ordering::SeqCst);
        Ok(description)
    }

    async fn role_details(&self, role_name: &str) -> AwsResult<RoleDetails> {
        self.lookups_started.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let result = if self.fail_role_details_for.as_deref() == Some(role_name) {
            Err(AwsError::IamError(format!("GetRole denied for {role_name}")))
        } else {
            Ok(self.role_details.get(role_name).cloned().unwrap_or_default())
        };
        self.lookups_finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn policy_tags(&self, policy_arn: &str) -> AwsResult<Tags> {
        Ok(self.policy_tags.get(policy_arn).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TagLookup for FakeAccount {
    async fn multiple_policy_tags(
        &self,
        policy_arns: &[String],
    ) -> AwsResult<HashMap<String, Tags>> {
        if self.fail_tag_lookup {
            return Err(AwsError::TaggingError("tags denied".to_string()));
        }
        let mut tags = HashMap::new();
        for arn in policy_arns {
            tags.insert(arn.clone(), self.policy_tags(arn).await?);
        }
        Ok(tags)
    }
}

#[async_trait]
impl S3Enumeration for FakeAccount {
    async fn list_all_buckets(&self) -> AwsResult<Vec<BucketRecord>> {
        if self.fail_s3_listing {
            return Err(AwsError::S3Error("ListBuckets denied".to_string()));
        }
        Ok(self.buckets.clone())
    }
}

/// An ownership source serving a fixed index.
#[derive(Default)]
pub struct FakeOwnership {
    pub index: OwnershipIndex,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeOwnership {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OwnershipSource for FakeOwnership {
    async fn populate(&self) -> AwsResult<OwnershipIndex> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AwsError::OwnershipError("DescribeStacks denied".to_string()));
        }
        Ok(self.index.clone())
    }
}

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// URL-encode a document the way IAM returns it.
pub fn encoded(json: &str) -> String {
    utf8_percent_encode(json, NON_ALPHANUMERIC).to_string()
}

pub fn policy_arn(name: &str) -> String {
    format!("arn:aws:iam::{ACCOUNT_ID}:policy/{name}")
}

pub fn inline(name: &str, json: &str) -> PolicyDetail {
    PolicyDetail {
        name: name.to_string(),
        document: encoded(json),
    }
}

pub fn user(name: &str, path: &str) -> UserDetail {
    UserDetail {
        name: name.to_string(),
        path: path.to_string(),
        ..UserDetail::default()
    }
}

pub fn role(name: &str, path: &str) -> RoleDetail {
    RoleDetail {
        name: name.to_string(),
        path: path.to_string(),
        assume_role_policy_document: encoded(TRUST_POLICY),
        ..RoleDetail::default()
    }
}

pub fn version(id: &str, is_default: bool, day: u32) -> PolicyVersionRecord {
    PolicyVersionRecord {
        version_id: id.to_string(),
        document: encoded(&format!(
            r#"{{"Version":"2012-10-17","Statement":[{{"Sid":"{id}","Effect":"Allow","Action":"s3:GetObject","Resource":"*"}}]}}"#
        )),
        is_default_version: is_default,
        create_date: Utc
            .with_ymd_and_hms(2024, 3, day, 12, 0, 0)
            .single()
            .expect("valid date"),
    }
}

pub fn managed_policy(name: &str, path: &str) -> ManagedPolicyDetail {
    ManagedPolicyDetail {
        name: name.to_string(),
        path: path.to_string(),
        arn: policy_arn(name),
        versions: vec![version("v1", true, 1)],
    }
}

pub fn instance_profile(name: &str, roles: &[&str]) -> InstanceProfileRecord {
    InstanceProfileRecord {
        name: name.to_string(),
        path: "/".to_string(),
        role_names: roles.iter().map(|r| (*r).to_string()).collect(),
    }
}

pub fn bucket(name: &str, policy_json: &str, bucket_tags: Tags) -> BucketRecord {
    BucketRecord {
        name: name.to_string(),
        policy_json: policy_json.to_string(),
        tags: bucket_tags,
    }
}
