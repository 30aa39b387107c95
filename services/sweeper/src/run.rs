//! `run` command: refresh and sweep each configured user in turn
//!
//! Failures are isolated per user. Only a rate-limit protocol error stops
//! the run, since the gate it closed is shared by every later request.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use reddit_auth::{Credential, CredentialStore, TokenExchanger};
use retention::{ApiClient, RetentionPolicy, sweep_user};
use tracing::{debug, info, warn};

use crate::error::{Error, Phase, Result, Severity};

/// Refresh access tokens expiring within this window of the user's turn.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub swept: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deleted: usize,
}

/// Shared handles for one run.
///
/// `clock` is read once per user, right before that user's refresh check,
/// and the same instant anchors the sweep's retention cutoffs. Earlier users
/// can take long enough behind the rate gate for a token that looked fresh
/// at startup to expire.
pub struct Runner<'a> {
    pub exchanger: &'a TokenExchanger,
    pub api: &'a ApiClient,
    pub store: &'a CredentialStore,
    pub clock: &'a (dyn Fn() -> SystemTime + Sync),
}

impl Runner<'_> {
    pub async fn run(&self, policies: &BTreeMap<String, RetentionPolicy>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let mut selected = Vec::new();
        for (username, policy) in policies {
            if policy.keeps_everything() {
                info!(username, "both retention windows are forever, skipping");
                summary.skipped += 1;
                continue;
            }
            let Some(credential) = self.store.get(username).await else {
                warn!(username, "no stored credential, run `auth` for this account");
                summary.skipped += 1;
                continue;
            };
            selected.push((username.as_str(), policy, credential));
        }

        for (username, policy, credential) in selected {
            let now = (self.clock)();
            let credential = self.refresh_if_expiring(username, credential, now).await?;

            match sweep_user(self.api, &credential, username, policy, now).await {
                Ok(result) => {
                    info!(
                        username,
                        queued = result.queued,
                        deleted = result.deleted,
                        "user swept"
                    );
                    summary.swept += 1;
                    summary.deleted += result.deleted;
                }
                Err(e) => {
                    let err = Error::from(e);
                    if err.severity(Phase::Run) == Severity::Fatal {
                        return Err(err);
                    }
                    warn!(username, error = %err, "sweep failed, continuing with next user");
                    summary.failed += 1;
                }
            }
        }

        info!(
            swept = summary.swept,
            skipped = summary.skipped,
            failed = summary.failed,
            deleted = summary.deleted,
            "run complete"
        );
        Ok(summary)
    }

    /// Refresh `credential` if it is about to expire.
    ///
    /// A failed refresh falls back to the stored credential; the sweep then
    /// fails on its own if the token really is dead.
    async fn refresh_if_expiring(
        &self,
        username: &str,
        credential: Credential,
        now: SystemTime,
    ) -> Result<Credential> {
        if !credential.expires_within(REFRESH_THRESHOLD, now) {
            debug!(username, "access token still valid");
            return Ok(credential);
        }

        match self
            .exchanger
            .refresh_credential(&credential.refresh_token)
            .await
        {
            Ok(fresh) => {
                if let Err(e) = self.store.upsert(username, fresh.clone()).await {
                    warn!(username, error = %e, "refreshed credential not persisted");
                }
                info!(username, "access token refreshed");
                Ok(fresh)
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(username, error = %e, "refresh failed, using stored credential");
                Ok(credential)
            }
        }
    }
}
