//! Paged scan of a user's overview listing

use std::time::SystemTime;

use reddit_auth::Credential;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Result;
use crate::listing::{Listing, RetentionTarget, classify};
use crate::policy::RetentionPolicy;

/// Largest page the listing endpoint serves.
pub const PAGE_LIMIT: &str = "100";

/// Collect every entry of `username` that has outlived its retention window.
///
/// Cutoffs are fixed from `now` once, so entries crossing the boundary while
/// paging do not flip between pages.
pub async fn scan(
    client: &ApiClient,
    credential: &Credential,
    username: &str,
    policy: &RetentionPolicy,
    now: SystemTime,
) -> Result<Vec<RetentionTarget>> {
    let cutoffs = policy.cutoffs(now);
    let path = format!("user/{username}/overview");

    let mut targets = Vec::new();
    let mut after: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let mut query = vec![("limit", PAGE_LIMIT)];
        if let Some(cursor) = after.as_deref() {
            query.push(("after", cursor));
        }

        let listing: Listing = client.get_json(credential, &path, &query).await?;
        pages += 1;

        let seen = listing.data.children.len();
        let before = targets.len();
        targets.extend(
            listing
                .data
                .children
                .iter()
                .filter_map(|thing| classify(thing, &cutoffs)),
        );
        info!(
            username,
            page = pages,
            entries = seen,
            queued = targets.len() - before,
            "scanned overview page"
        );

        match listing.data.after {
            Some(cursor) if !cursor.is_empty() => after = Some(cursor),
            _ => break,
        }
    }

    debug!(username, pages, queued = targets.len(), "overview scan complete");
    Ok(targets)
}
