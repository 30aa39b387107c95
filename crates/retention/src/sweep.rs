//! One user's pass: scan the overview for expired items, then delete them

use std::time::SystemTime;

use reddit_auth::Credential;
use tracing::info;

use crate::client::ApiClient;
use crate::delete::delete_all;
use crate::error::Result;
use crate::policy::RetentionPolicy;
use crate::scan::scan;

/// Outcome of sweeping one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub queued: usize,
    pub deleted: usize,
}

/// Scan then delete for one user.
pub async fn sweep_user(
    client: &ApiClient,
    credential: &Credential,
    username: &str,
    policy: &RetentionPolicy,
    now: SystemTime,
) -> Result<SweepSummary> {
    let targets = scan(client, credential, username, policy, now).await?;
    info!(username, queued = targets.len(), "scan finished, deleting");

    let deleted = delete_all(client, credential, &targets).await?;
    info!(username, deleted, "sweep finished");

    Ok(SweepSummary {
        queued: targets.len(),
        deleted,
    })
}
