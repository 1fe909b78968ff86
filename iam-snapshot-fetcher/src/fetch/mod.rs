//! Fetch orchestration
//!
//! A fetch resolves the account, optionally builds the CloudFormation ownership index,
//! then runs the IAM and S3 tasks in parallel. Each task owns the collections it fills:
//! the IAM task works on the snapshot itself and the S3 task returns bucket policies
//! that are added after both tasks finish. Any failure discards all fetched data.

mod iam;
mod s3;
mod versions;

use std::sync::Arc;

use log::info;
use tokio::task::JoinError;

use crate::account::Account;
use crate::capabilities::Capabilities;
use crate::classifier::{OwnershipClassifier, OwnershipIndex};
use crate::config::FetchOptions;
use crate::error::{FetchPhase, SnapshotError, SnapshotResult};
use crate::model::AccountSnapshot;

use iam::IamFetcher;
use s3::fetch_s3_data;

/// Fetches an account snapshot through a set of capability clients.
///
/// A fetcher is used once: [`Fetcher::fetch`] consumes it.
#[derive(Debug)]
pub struct Fetcher {
    options: FetchOptions,
    capabilities: Capabilities,
}

impl Fetcher {
    pub fn new(options: FetchOptions, capabilities: Capabilities) -> Self {
        Self {
            options,
            capabilities,
        }
    }

    /// Fetch the complete snapshot, or the first error. Never returns partial data.
    ///
    /// When both the IAM and S3 tasks fail, the IAM error is returned.
    pub async fn fetch(self) -> SnapshotResult<AccountSnapshot> {
        let account = self
            .resolve_account()
            .await
            .map_err(|e| e.in_phase(FetchPhase::Init))?;
        let snapshot = AccountSnapshot::new(account);

        let index = self
            .ownership_index()
            .await
            .map_err(|e| e.in_phase(FetchPhase::OwnershipIndex))?;
        let classifier = Arc::new(OwnershipClassifier::new(&self.options, index));

        info!("Fetching IAM data");
        let iam_task = tokio::spawn(
            IamFetcher::new(
                Arc::clone(&self.capabilities.iam),
                Arc::clone(&self.capabilities.enrichment),
                Arc::clone(&self.capabilities.tagging),
                Arc::clone(&classifier),
                !self.options.skip_fetching_policy_and_role_descriptions,
                snapshot,
            )
            .run(),
        );

        info!("Fetching S3 data");
        let s3_task = tokio::spawn(fetch_s3_data(
            Arc::clone(&self.capabilities.s3),
            classifier,
        ));

        let (iam_result, s3_result) = tokio::join!(iam_task, s3_task);
        let iam_result = flatten(iam_result).map_err(|e| e.in_phase(FetchPhase::Iam));
        let s3_result = flatten(s3_result).map_err(|e| e.in_phase(FetchPhase::S3));

        let mut snapshot = iam_result?;
        for bucket_policy in s3_result? {
            snapshot
                .add_bucket_policy(bucket_policy)
                .map_err(|e| e.in_phase(FetchPhase::S3))?;
        }

        info!(
            "Fetched {} users, {} groups, {} roles, {} policies, {} instance profiles, {} bucket policies for account {}",
            snapshot.users().len(),
            snapshot.groups().len(),
            snapshot.roles().len(),
            snapshot.policies().len(),
            snapshot.instance_profiles().len(),
            snapshot.bucket_policies().len(),
            snapshot.account()
        );
        Ok(snapshot)
    }

    async fn resolve_account(&self) -> SnapshotResult<Account> {
        let id = self.capabilities.identity.account_id().await?;
        let alias = self.capabilities.aliases.account_alias().await?;
        Ok(Account::new(id, alias))
    }

    async fn ownership_index(&self) -> SnapshotResult<OwnershipIndex> {
        if self.options.heuristic_cfn_matching {
            return Ok(OwnershipIndex::default());
        }
        info!("Fetching CFN data");
        Ok(self.capabilities.ownership.populate().await?)
    }
}

fn flatten<T>(joined: Result<SnapshotResult<T>, JoinError>) -> SnapshotResult<T> {
    joined.map_err(|e| SnapshotError::TaskFailed(e.to_string()))?
}
