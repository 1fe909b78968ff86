//! Managed policy version selection

use crate::capabilities::PolicyVersionRecord;
use crate::error::{SnapshotError, SnapshotResult};
use crate::model::VersionSummary;

/// Pick the default version of a policy and summarize the rest for pruning.
///
/// Fails when no version is flagged as the default.
pub(crate) fn select_versions<'a>(
    policy_name: &str,
    versions: &'a [PolicyVersionRecord],
) -> SnapshotResult<(&'a PolicyVersionRecord, VersionSummary)> {
    let default_version = versions
        .iter()
        .find(|v| v.is_default_version)
        .ok_or_else(|| SnapshotError::MissingDefaultVersion(policy_name.to_string()))?;

    // Ties go to the first version listed.
    let oldest_version_id = versions
        .iter()
        .min_by_key(|v| v.create_date)
        .map(|v| v.version_id.clone())
        .unwrap_or_default();

    let nondefault_version_ids = versions
        .iter()
        .filter(|v| !v.is_default_version)
        .map(|v| v.version_id.clone())
        .collect();

    Ok((
        default_version,
        VersionSummary {
            number_of_versions: versions.len(),
            oldest_version_id,
            nondefault_version_ids,
        },
    ))
}
