//! IAM fetch task: users, groups, roles, managed policies and instance profiles.

use std::sync::Arc;

use log::{debug, info};
use tokio::task::JoinSet;

use crate::aws::AwsResult;
use crate::capabilities::{
    AuthorizationDetails, GroupDetail, IamEnrichment, IamEnumeration, InstanceProfileRecord,
    ManagedPolicyDetail, PolicyDetail, RoleDetail, RoleDetails, TagLookup, UserDetail,
};
use crate::classifier::{OwnershipClassifier, ResourceKind};
use crate::error::{SnapshotError, SnapshotResult};
use crate::fetch::versions::select_versions;
use crate::model::{
    AccountSnapshot, Group, InlinePolicy, InstanceProfile, Policy, Role, Tags, User,
};
use crate::policy_document::PolicyDocument;

/// The result of one enrichment lookup, tagged with the index of the record it fills in.
enum Enrichment {
    PolicyDescription {
        index: usize,
        result: AwsResult<Option<String>>,
    },
    Role {
        index: usize,
        result: AwsResult<RoleDetails>,
    },
}

pub(crate) struct IamFetcher {
    iam: Arc<dyn IamEnumeration>,
    enrichment: Arc<dyn IamEnrichment>,
    tagging: Arc<dyn TagLookup>,
    classifier: Arc<OwnershipClassifier>,
    fetch_descriptions: bool,
    snapshot: AccountSnapshot,
    pending: JoinSet<Enrichment>,
}

impl IamFetcher {
    pub(crate) fn new(
        iam: Arc<dyn IamEnumeration>,
        enrichment: Arc<dyn IamEnrichment>,
        tagging: Arc<dyn TagLookup>,
        classifier: Arc<OwnershipClassifier>,
        fetch_descriptions: bool,
        snapshot: AccountSnapshot,
    ) -> Self {
        Self {
            iam,
            enrichment,
            tagging,
            classifier,
            fetch_descriptions,
            snapshot,
            pending: JoinSet::new(),
        }
    }

    /// Fetch every page, then wait for all enrichment lookups.
    ///
    /// Lookups already dispatched run to completion even if a page fails. The first
    /// failure is returned, with page failures taking precedence.
    pub(crate) async fn run(mut self) -> SnapshotResult<AccountSnapshot> {
        let fetched = self.fetch_pages().await;
        let enriched = self.drain_enrichment().await;
        fetched?;
        enriched?;
        Ok(self.snapshot)
    }

    async fn fetch_pages(&mut self) -> SnapshotResult<()> {
        let mut marker = None;
        let mut pages = 0usize;
        loop {
            let page = self.iam.authorization_details_page(marker).await?;
            pages += 1;
            self.populate_iam_data(page.items).await?;
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        debug!("Processed {pages} pages of account authorization details");

        let mut marker = None;
        loop {
            let page = self.iam.instance_profiles_page(marker).await?;
            self.populate_instance_profiles(page.items)?;
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(())
    }

    async fn populate_iam_data(&mut self, details: AuthorizationDetails) -> SnapshotResult<()> {
        for user in details.users {
            self.populate_user(user)?;
        }
        for group in details.groups {
            self.populate_group(group)?;
        }
        for role in details.roles {
            self.populate_role(role)?;
        }

        if !details.policies.is_empty() {
            let arns: Vec<String> = details.policies.iter().map(|p| p.arn.clone()).collect();
            let mut tags_by_arn = self.tagging.multiple_policy_tags(&arns).await?;
            for policy in details.policies {
                let tags = tags_by_arn.remove(&policy.arn).unwrap_or_default();
                self.populate_policy(policy, tags)?;
            }
        }

        Ok(())
    }

    fn normalise_policy_arns(&self, arns: &[String]) -> Vec<String> {
        let account = self.snapshot.account();
        arns.iter()
            .map(|arn| account.normalise_policy_arn(arn))
            .collect()
    }

    fn populate_user(&mut self, user: UserDetail) -> SnapshotResult<()> {
        if self
            .classifier
            .should_skip(ResourceKind::IamUser, &user.name, &user.tags, &user.path)
        {
            return Ok(());
        }

        let policies = self.normalise_policy_arns(&user.attached_policy_arns);
        self.snapshot.add_user(User {
            inline_policies: parse_inline_policies(user.inline_policies)?,
            name: user.name,
            path: user.path,
            groups: user.groups,
            policies,
            tags: user.tags,
        })
    }

    fn populate_group(&mut self, group: GroupDetail) -> SnapshotResult<()> {
        if self
            .classifier
            .should_skip(ResourceKind::IamGroup, &group.name, &Tags::new(), &group.path)
        {
            return Ok(());
        }

        let policies = self.normalise_policy_arns(&group.attached_policy_arns);
        self.snapshot.add_group(Group {
            inline_policies: parse_inline_policies(group.inline_policies)?,
            name: group.name,
            path: group.path,
            policies,
        })
    }

    fn populate_role(&mut self, role: RoleDetail) -> SnapshotResult<()> {
        if self
            .classifier
            .should_skip(ResourceKind::IamRole, &role.name, &role.tags, &role.path)
        {
            return Ok(());
        }

        let trust_policy = PolicyDocument::from_encoded_json(&role.assume_role_policy_document)?;
        let policies = self.normalise_policy_arns(&role.attached_policy_arns);
        let mut record = Role::new(role.name.clone(), role.path, trust_policy);
        record.policies = policies;
        record.inline_policies = parse_inline_policies(role.inline_policies)?;

        let index = self.snapshot.roles().len();
        self.snapshot.add_role(record)?;
        if self.fetch_descriptions {
            self.dispatch_role_details(index, role.name);
        }
        Ok(())
    }

    fn populate_policy(&mut self, policy: ManagedPolicyDetail, tags: Tags) -> SnapshotResult<()> {
        if self
            .classifier
            .should_skip(ResourceKind::IamPolicy, &policy.name, &Tags::new(), &policy.path)
        {
            return Ok(());
        }
        // Tag rules can only be checked now that tags are known.
        if self
            .classifier
            .should_skip(ResourceKind::IamPolicy, &policy.name, &tags, &policy.path)
        {
            return Ok(());
        }

        let (default_version, versions) = select_versions(&policy.name, &policy.versions)?;
        let document = PolicyDocument::from_encoded_json(&default_version.document)?;
        let mut record = Policy::new(policy.name, policy.path, document);
        record.versions = versions;
        record.tags = tags;

        let index = self.snapshot.policies().len();
        self.snapshot.add_policy(record)?;
        if self.fetch_descriptions {
            self.dispatch_policy_description(index, policy.arn);
        }
        Ok(())
    }

    fn populate_instance_profiles(
        &mut self,
        profiles: Vec<InstanceProfileRecord>,
    ) -> SnapshotResult<()> {
        for profile in profiles {
            if self.classifier.should_skip(
                ResourceKind::InstanceProfile,
                &profile.name,
                &Tags::new(),
                &profile.path,
            ) {
                continue;
            }

            let mut record = InstanceProfile::new(profile.name, profile.path);
            record.roles = profile.role_names;
            self.snapshot.add_instance_profile(record)?;
        }
        Ok(())
    }

    fn dispatch_policy_description(&mut self, index: usize, policy_arn: String) {
        debug!("Fetching policy description for {policy_arn}");
        let enrichment = Arc::clone(&self.enrichment);
        self.pending.spawn(async move {
            let result = enrichment.policy_description(&policy_arn).await;
            Enrichment::PolicyDescription { index, result }
        });
    }

    fn dispatch_role_details(&mut self, index: usize, role_name: String) {
        debug!("Fetching role description for {role_name}");
        let enrichment = Arc::clone(&self.enrichment);
        self.pending.spawn(async move {
            let result = enrichment.role_details(&role_name).await;
            Enrichment::Role { index, result }
        });
    }

    /// Wait for every dispatched lookup and apply the results. Keeps draining after a
    /// failure and returns the first one seen.
    async fn drain_enrichment(&mut self) -> SnapshotResult<()> {
        if !self.pending.is_empty() {
            info!("Waiting for {} description lookups", self.pending.len());
        }

        let mut first_error = None;
        while let Some(joined) = self.pending.join_next().await {
            let applied = match joined {
                Ok(enrichment) => self.apply_enrichment(enrichment),
                Err(e) => Err(SnapshotError::TaskFailed(e.to_string())),
            };
            if let Err(e) = applied {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn apply_enrichment(&mut self, enrichment: Enrichment) -> SnapshotResult<()> {
        match enrichment {
            Enrichment::PolicyDescription { index, result } => {
                let description = result?;
                if let Some(policy) = self.snapshot.policy_mut(index) {
                    policy.description = description.filter(|d| !d.is_empty());
                }
            }
            Enrichment::Role { index, result } => {
                let details = result?;
                if let Some(role) = self.snapshot.role_mut(index) {
                    role.description = details.description.filter(|d| !d.is_empty());
                    role.max_session_duration = details.max_session_duration.filter(|d| *d > 0);
                }
            }
        }
        Ok(())
    }
}

fn parse_inline_policies(source: Vec<PolicyDetail>) -> SnapshotResult<Vec<InlinePolicy>> {
    source
        .into_iter()
        .map(|detail| {
            Ok(InlinePolicy {
                policy: PolicyDocument::from_encoded_json(&detail.document)?,
                name: detail.name,
            })
        })
        .collect()
}
