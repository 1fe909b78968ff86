//! Fetch behavior options

use serde::{Deserialize, Serialize};

/// Options controlling what a fetch retrieves and which resources it leaves out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Skip the per-policy and per-role lookups for descriptions and max session
    /// duration. Those fields are immutable after creation, so callers that only push
    /// changes can leave them out.
    pub skip_fetching_policy_and_role_descriptions: bool,
    /// Skip the CloudFormation ownership lookup entirely. Stack ownership is then not
    /// checked at all, and no resource is skipped as infrastructure-managed; only the tag
    /// and path rules apply.
    pub heuristic_cfn_matching: bool,
    /// Tag keys marking a resource as owned elsewhere.
    pub skip_tagged: Vec<String>,
    /// Tag keys that force a resource to be included, overriding every other rule.
    pub include_tagged: Vec<String>,
    /// Resources under any of these paths are skipped.
    pub skip_path_prefixes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_use_defaults() {
        let options: FetchOptions = serde_json::from_str(
            r#"{"skip_tagged": ["aws:cloudformation:stack-name"], "heuristic_cfn_matching": true}"#,
        )
        .expect("valid options");

        assert!(options.heuristic_cfn_matching);
        assert!(!options.skip_fetching_policy_and_role_descriptions);
        assert_eq!(options.skip_tagged, vec!["aws:cloudformation:stack-name"]);
        assert!(options.include_tagged.is_empty());
        assert!(options.skip_path_prefixes.is_empty());
    }
}
