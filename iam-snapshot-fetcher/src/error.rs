//! Crate-level error types

use std::fmt;

use thiserror::Error;

use crate::aws::AwsError;

/// The stage of a fetch that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPhase {
    /// Resolving the account id and alias
    Init,
    /// Building the infrastructure-ownership index
    OwnershipIndex,
    /// Fetching users, groups, roles, policies and instance profiles
    Iam,
    /// Fetching bucket policies
    S3,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Init => "in init",
            Self::OwnershipIndex => "fetching CFN data",
            Self::Iam => "fetching IAM data",
            Self::S3 => "fetching S3 data",
        };
        f.write_str(phase)
    }
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Can't create account name from '{0}'")]
    InvalidAccount(String),

    #[error("Error creating policy document: {0}")]
    PolicyDocument(String),

    #[error("Expected a default policy version for policy '{0}'")]
    MissingDefaultVersion(String),

    #[error("Duplicate {kind} '{name}' at path '{path}'")]
    DuplicateResource {
        kind: &'static str,
        name: String,
        path: String,
    },

    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error("Error {phase}: {source}")]
    Phase {
        phase: FetchPhase,
        source: Box<SnapshotError>,
    },

    #[error("Fetch task did not complete: {0}")]
    TaskFailed(String),
}

impl SnapshotError {
    pub fn policy_document(message: impl Into<String>) -> Self {
        Self::PolicyDocument(message.into())
    }

    /// Wrap this error with the fetch phase it was raised in.
    pub(crate) fn in_phase(self, phase: FetchPhase) -> Self {
        Self::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// The fetch phase this error was raised in, if it was wrapped with one.
    pub fn phase(&self) -> Option<FetchPhase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wraps_message() {
        let err = SnapshotError::Aws(AwsError::S3Error("access denied".to_string()))
            .in_phase(FetchPhase::S3);
        assert_eq!(err.phase(), Some(FetchPhase::S3));
        assert_eq!(
            err.to_string(),
            "Error fetching S3 data: S3 client error: access denied"
        );
    }

    #[test]
    fn test_unwrapped_error_has_no_phase() {
        let err = SnapshotError::InvalidAccount("prod-".to_string());
        assert_eq!(err.phase(), None);
    }
}
