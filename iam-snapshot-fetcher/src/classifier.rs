//! Ownership classification: deciding which discovered resources are left out of the
//! snapshot because something else (a CloudFormation stack, AWS itself) owns them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::FetchOptions;
use crate::model::Tags;

/// Substrings identifying AWS service-linked roles and their policies.
const SERVICE_LINKED_ROLE_MARKERS: &[&str] = &["AWSServiceRole", "aws-service-role"];

/// The kind of a resource as CloudFormation names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    IamUser,
    IamGroup,
    IamRole,
    IamPolicy,
    InstanceProfile,
    S3Bucket,
}

impl ResourceKind {
    pub fn cloudformation_type(&self) -> &'static str {
        match self {
            Self::IamUser => "AWS::IAM::User",
            Self::IamGroup => "AWS::IAM::Group",
            Self::IamRole => "AWS::IAM::Role",
            Self::IamPolicy => "AWS::IAM::ManagedPolicy",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::S3Bucket => "AWS::S3::Bucket",
        }
    }

    pub fn from_cloudformation_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            "AWS::IAM::User" => Some(Self::IamUser),
            "AWS::IAM::Group" => Some(Self::IamGroup),
            "AWS::IAM::Role" => Some(Self::IamRole),
            "AWS::IAM::ManagedPolicy" => Some(Self::IamPolicy),
            "AWS::IAM::InstanceProfile" => Some(Self::InstanceProfile),
            "AWS::S3::Bucket" => Some(Self::S3Bucket),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cloudformation_type())
    }
}

/// Resources owned by infrastructure-as-code stacks, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipIndex {
    managed: HashMap<ResourceKind, HashSet<String>>,
}

impl OwnershipIndex {
    pub fn insert(&mut self, kind: ResourceKind, identifier: impl Into<String>) {
        self.managed.entry(kind).or_default().insert(identifier.into());
    }

    pub fn is_managed(&self, kind: ResourceKind, identifier: &str) -> bool {
        self.managed
            .get(&kind)
            .is_some_and(|ids| ids.contains(identifier))
    }

    pub fn len(&self) -> usize {
        self.managed.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(ResourceKind, String)> for OwnershipIndex {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, String)>>(iter: I) -> Self {
        let mut index = Self::default();
        for (kind, identifier) in iter {
            index.insert(kind, identifier);
        }
        index
    }
}

/// Why a resource was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Carries a skip tag; the value is usually the owning stack's name.
    Tagged { tag: String, value: String },
    PathPrefix { path: String, prefix: String },
    InfrastructureManaged,
    ServiceLinkedRole,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tagged { tag, value } => write!(f, "tagged with {tag} in stack {value}"),
            Self::PathPrefix { path, prefix } => write!(f, "path {path} matches {prefix}"),
            Self::InfrastructureManaged => f.write_str("CloudFormation generated resource"),
            Self::ServiceLinkedRole => f.write_str("AWS service role generated resource"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Include,
    Skip(SkipReason),
}

impl Decision {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// Applies the include/skip rules, in order: force-include tags, skip tags, path
/// prefixes, the ownership index, then service-linked role names.
#[derive(Debug, Clone, Default)]
pub struct OwnershipClassifier {
    include_tagged: Vec<String>,
    skip_tagged: Vec<String>,
    skip_path_prefixes: Vec<String>,
    index: OwnershipIndex,
}

impl OwnershipClassifier {
    pub fn new(options: &FetchOptions, index: OwnershipIndex) -> Self {
        Self {
            include_tagged: options.include_tagged.clone(),
            skip_tagged: options.skip_tagged.clone(),
            skip_path_prefixes: options.skip_path_prefixes.clone(),
            index,
        }
    }

    pub fn classify(
        &self,
        kind: ResourceKind,
        identifier: &str,
        tags: &Tags,
        path: &str,
    ) -> Decision {
        if self.include_tagged.iter().any(|tag| tags.contains_key(tag)) {
            return Decision::Include;
        }

        for tag in &self.skip_tagged {
            if let Some(value) = tags.get(tag) {
                return Decision::Skip(SkipReason::Tagged {
                    tag: tag.clone(),
                    value: value.clone(),
                });
            }
        }

        if let Some(prefix) = self
            .skip_path_prefixes
            .iter()
            .find(|prefix| path.starts_with(prefix.as_str()))
        {
            return Decision::Skip(SkipReason::PathPrefix {
                path: path.to_string(),
                prefix: prefix.clone(),
            });
        }

        if self.index.is_managed(kind, identifier) {
            return Decision::Skip(SkipReason::InfrastructureManaged);
        }

        if SERVICE_LINKED_ROLE_MARKERS
            .iter()
            .any(|marker| identifier.contains(marker))
        {
            return Decision::Skip(SkipReason::ServiceLinkedRole);
        }

        Decision::Include
    }

    /// Classify and log any skip. Returns true when the resource should be left out.
    pub(crate) fn should_skip(
        &self,
        kind: ResourceKind,
        identifier: &str,
        tags: &Tags,
        path: &str,
    ) -> bool {
        match self.classify(kind, identifier, tags, path) {
            Decision::Include => false,
            Decision::Skip(reason) => {
                info!("Skipping {kind} {identifier}: {reason}");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const STACK_TAG: &str = "aws:cloudformation:stack-name";
    const KEEP_TAG: &str = "snapshot:manage";

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn classifier(index: OwnershipIndex) -> OwnershipClassifier {
        let options = FetchOptions {
            include_tagged: vec![KEEP_TAG.to_string()],
            skip_tagged: vec![STACK_TAG.to_string()],
            skip_path_prefixes: vec!["/aws-reserved/".to_string(), "/cdk/".to_string()],
            ..FetchOptions::default()
        };
        OwnershipClassifier::new(&options, index)
    }

    #[test]
    fn test_plain_resource_is_included() {
        let decision = classifier(OwnershipIndex::default()).classify(
            ResourceKind::IamUser,
            "alice",
            &Tags::new(),
            "/",
        );
        assert_eq!(decision, Decision::Include);
    }

    #[test]
    fn test_force_include_beats_skip_tag() {
        let index: OwnershipIndex = [(ResourceKind::IamRole, "AWSServiceRoleForECS".to_string())]
            .into_iter()
            .collect();
        let decision = classifier(index).classify(
            ResourceKind::IamRole,
            "AWSServiceRoleForECS",
            &tags(&[(KEEP_TAG, "yes"), (STACK_TAG, "network")]),
            "/aws-reserved/sso/",
        );
        assert_eq!(decision, Decision::Include);
    }

    #[test]
    fn test_skip_tag_names_stack() {
        let decision = classifier(OwnershipIndex::default()).classify(
            ResourceKind::IamRole,
            "lambda-exec",
            &tags(&[(STACK_TAG, "billing-api")]),
            "/",
        );
        assert_eq!(
            decision,
            Decision::Skip(SkipReason::Tagged {
                tag: STACK_TAG.to_string(),
                value: "billing-api".to_string(),
            })
        );
        if let Decision::Skip(reason) = decision {
            assert!(reason.to_string().contains("billing-api"));
        }
    }

    #[rstest]
    #[case(ResourceKind::IamRole, "/aws-reserved/sso.amazonaws.com/", "/aws-reserved/")]
    #[case(ResourceKind::IamUser, "/cdk/", "/cdk/")]
    #[case(ResourceKind::InstanceProfile, "/cdk/bastion/", "/cdk/")]
    fn test_path_prefix_skips_without_tags_or_index(
        #[case] kind: ResourceKind,
        #[case] path: &str,
        #[case] prefix: &str,
    ) {
        let decision =
            classifier(OwnershipIndex::default()).classify(kind, "anything", &Tags::new(), path);
        assert_eq!(
            decision,
            Decision::Skip(SkipReason::PathPrefix {
                path: path.to_string(),
                prefix: prefix.to_string(),
            })
        );
    }

    #[test]
    fn test_ownership_index_is_per_kind() {
        let index: OwnershipIndex = [(ResourceKind::IamRole, "app-role".to_string())]
            .into_iter()
            .collect();
        let classifier = classifier(index);

        assert_eq!(
            classifier.classify(ResourceKind::IamRole, "app-role", &Tags::new(), "/"),
            Decision::Skip(SkipReason::InfrastructureManaged)
        );
        assert_eq!(
            classifier.classify(ResourceKind::IamUser, "app-role", &Tags::new(), "/"),
            Decision::Include
        );
    }

    #[rstest]
    #[case("AWSServiceRoleForAutoScaling")]
    #[case("aws-service-role/ecs.amazonaws.com")]
    fn test_service_linked_role_is_skipped(#[case] identifier: &str) {
        let decision = classifier(OwnershipIndex::default()).classify(
            ResourceKind::IamRole,
            identifier,
            &Tags::new(),
            "/",
        );
        assert_eq!(decision, Decision::Skip(SkipReason::ServiceLinkedRole));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let index: OwnershipIndex = [(ResourceKind::IamPolicy, "Managed".to_string())]
            .into_iter()
            .collect();
        let classifier = classifier(index);
        let inputs = [
            ("Managed", Tags::new(), "/"),
            ("Loose", Tags::new(), "/"),
            ("Stacked", tags(&[(STACK_TAG, "s")]), "/"),
            ("Reserved", Tags::new(), "/aws-reserved/"),
        ];

        for (identifier, tags, path) in &inputs {
            let first = classifier.classify(ResourceKind::IamPolicy, identifier, tags, path);
            for _ in 0..3 {
                assert_eq!(
                    classifier.classify(ResourceKind::IamPolicy, identifier, tags, path),
                    first
                );
            }
        }
    }

    #[test]
    fn test_should_skip_matches_decision() {
        let classifier = classifier(OwnershipIndex::default());
        assert!(classifier.should_skip(ResourceKind::IamRole, "x", &Tags::new(), "/cdk/"));
        assert!(!classifier.should_skip(ResourceKind::IamRole, "x", &Tags::new(), "/"));
    }

    #[test]
    fn test_cloudformation_type_names_round_trip() {
        for kind in [
            ResourceKind::IamUser,
            ResourceKind::IamGroup,
            ResourceKind::IamRole,
            ResourceKind::IamPolicy,
            ResourceKind::InstanceProfile,
            ResourceKind::S3Bucket,
        ] {
            assert_eq!(
                ResourceKind::from_cloudformation_type(kind.cloudformation_type()),
                Some(kind)
            );
        }
        assert_eq!(ResourceKind::from_cloudformation_type("AWS::SNS::Topic"), None);
    }

    #[test]
    fn test_index_len() {
        let mut index = OwnershipIndex::default();
        assert!(index.is_empty());
        index.insert(ResourceKind::IamRole, "a");
        index.insert(ResourceKind::IamRole, "a");
        index.insert(ResourceKind::IamUser, "a");
        assert_eq!(index.len(), 2);
    }
}
