//! AWS account identity and ARN construction

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SnapshotError, SnapshotResult};
use crate::model::AwsResource;

/// `<alias>-<digits>` or `<digits>`; the alias is everything before the final `-digits` run.
/// Both parts are ASCII only.
fn account_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(([A-Za-z0-9_-]+)-)?([0-9]+)$").expect("account pattern is valid")
    })
}

/// An AWS account id with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    id: String,
    alias: Option<String>,
}

impl Account {
    pub fn new(id: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.filter(|a| !a.is_empty()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Build an IAM ARN in this account: `arn:aws:iam::<id>:<key><path><name>`
    pub fn arn_for(&self, key: &str, path: &str, name: &str) -> String {
        format!("arn:aws:iam::{}:{key}{path}{name}", self.id)
    }

    /// The canonical ARN of a resource living in this account.
    pub fn arn(&self, resource: &impl AwsResource) -> String {
        match resource.service() {
            "s3" => format!("arn:aws:s3:::{}", resource.resource_name()),
            _ => self.arn_for(
                resource.resource_type(),
                resource.resource_path(),
                resource.resource_name(),
            ),
        }
    }

    fn policy_arn_prefix(&self) -> String {
        format!("arn:aws:iam::{}:policy/", self.id)
    }

    /// Expand a bare policy name to a policy ARN in this account. Anything that is
    /// already an ARN is returned as is.
    pub fn policy_arn_from_string(&self, name_or_arn: &str) -> String {
        if name_or_arn.starts_with("arn:") {
            return name_or_arn.to_string();
        }
        format!("{}{name_or_arn}", self.policy_arn_prefix())
    }

    /// Strip this account's policy ARN prefix. Policies owned by other accounts or by
    /// AWS keep their full ARN.
    pub fn normalise_policy_arn(&self, arn: &str) -> String {
        let prefix = self.policy_arn_prefix();
        arn.strip_prefix(&prefix).unwrap_or(arn).to_string()
    }
}

impl FromStr for Account {
    type Err = SnapshotError;

    fn from_str(s: &str) -> SnapshotResult<Self> {
        let captures = account_pattern()
            .captures(s)
            .ok_or_else(|| SnapshotError::InvalidAccount(s.to_string()))?;

        let id = captures
            .get(3)
            .ok_or_else(|| SnapshotError::InvalidAccount(s.to_string()))?;
        let alias = captures.get(2).map(|m| m.as_str().to_string());

        Ok(Self::new(id.as_str(), alias))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{alias}-{}", self.id),
            None => f.write_str(&self.id),
        }
    }
}
