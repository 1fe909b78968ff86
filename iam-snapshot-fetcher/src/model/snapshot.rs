//! The account snapshot: every fetched resource, bound to one account.

use std::collections::HashSet;

use crate::account::Account;
use crate::error::{SnapshotError, SnapshotResult};
use crate::model::{AwsResource, BucketPolicy, Group, InstanceProfile, Policy, Role, User};

/// All users, groups, roles, policies, instance profiles and bucket policies of an account.
///
/// Collections keep insertion order. Adding a resource whose `(name, path)` is already
/// taken by the same kind fails, as does adding a second policy for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    account: Account,
    users: Vec<User>,
    groups: Vec<Group>,
    roles: Vec<Role>,
    policies: Vec<Policy>,
    instance_profiles: Vec<InstanceProfile>,
    bucket_policies: Vec<BucketPolicy>,
    keys: HashSet<(&'static str, String, String)>,
}

impl AccountSnapshot {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            users: Vec::new(),
            groups: Vec::new(),
            roles: Vec::new(),
            policies: Vec::new(),
            instance_profiles: Vec::new(),
            bucket_policies: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// An empty snapshot for an account given as `<alias>-<id>` or `<id>`.
    pub fn from_account_name(account: &str) -> SnapshotResult<Self> {
        Ok(Self::new(account.parse()?))
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn instance_profiles(&self) -> &[InstanceProfile] {
        &self.instance_profiles
    }

    pub fn bucket_policies(&self) -> &[BucketPolicy] {
        &self.bucket_policies
    }

    fn claim(&mut self, resource: &impl AwsResource) -> SnapshotResult<()> {
        let key = (
            resource.resource_type(),
            resource.resource_name().to_string(),
            resource.resource_path().to_string(),
        );
        if self.keys.contains(&key) {
            let (kind, name, path) = key;
            let kind = if kind.is_empty() { "bucket policy" } else { kind };
            return Err(SnapshotError::DuplicateResource { kind, name, path });
        }
        self.keys.insert(key);
        Ok(())
    }

    pub fn add_user(&mut self, user: User) -> SnapshotResult<()> {
        self.claim(&user)?;
        self.users.push(user);
        Ok(())
    }

    pub fn add_group(&mut self, group: Group) -> SnapshotResult<()> {
        self.claim(&group)?;
        self.groups.push(group);
        Ok(())
    }

    pub fn add_role(&mut self, role: Role) -> SnapshotResult<()> {
        self.claim(&role)?;
        self.roles.push(role);
        Ok(())
    }

    pub fn add_policy(&mut self, policy: Policy) -> SnapshotResult<()> {
        self.claim(&policy)?;
        self.policies.push(policy);
        Ok(())
    }

    pub fn add_instance_profile(&mut self, profile: InstanceProfile) -> SnapshotResult<()> {
        self.claim(&profile)?;
        self.instance_profiles.push(profile);
        Ok(())
    }

    pub fn add_bucket_policy(&mut self, bucket_policy: BucketPolicy) -> SnapshotResult<()> {
        self.claim(&bucket_policy)?;
        self.bucket_policies.push(bucket_policy);
        Ok(())
    }

    pub(crate) fn role_mut(&mut self, index: usize) -> Option<&mut Role> {
        self.roles.get_mut(index)
    }

    pub(crate) fn policy_mut(&mut self, index: usize) -> Option<&mut Policy> {
        self.policies.get_mut(index)
    }

    pub fn find_user_by_name(&self, name: &str, path: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name && u.path == path)
    }

    pub fn find_group_by_name(&self, name: &str, path: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name && g.path == path)
    }

    pub fn find_role_by_name(&self, name: &str, path: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name && r.path == path)
    }

    pub fn find_policy_by_name(&self, name: &str, path: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name && p.path == path)
    }

    pub fn find_instance_profile_by_name(
        &self,
        name: &str,
        path: &str,
    ) -> Option<&InstanceProfile> {
        self.instance_profiles
            .iter()
            .find(|p| p.name == name && p.path == path)
    }

    pub fn find_bucket_policy_by_bucket_name(&self, name: &str) -> Option<&BucketPolicy> {
        self.bucket_policies.iter().find(|p| p.bucket_name == name)
    }
}
