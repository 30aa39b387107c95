//! One-at-a-time deletion of queued entries

use reddit_auth::Credential;
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::listing::RetentionTarget;

const PROGRESS_EVERY: usize = 10;

/// Delete `targets` in order, stopping at the first failure.
///
/// Returns the number deleted. On failure the error carries how far the
/// run got; nothing is retried.
pub async fn delete_all(
    client: &ApiClient,
    credential: &Credential,
    targets: &[RetentionTarget],
) -> Result<usize> {
    let total = targets.len();

    for (deleted, target) in targets.iter().enumerate() {
        if let Err(source) = client
            .post_form::<IgnoredAny>(credential, "api/del", &[("id", target.name.as_str())])
            .await
        {
            warn!(
                id = %target.name,
                deleted,
                total,
                error = %source,
                "delete failed, abandoning remaining entries"
            );
            return Err(Error::DeleteAborted {
                deleted,
                total,
                source: Box::new(source),
            });
        }

        metrics::counter!("retention_entries_deleted_total", "kind" => target.kind.label())
            .increment(1);
        debug!(id = %target.name, kind = target.kind.label(), "deleted");

        let done = deleted + 1;
        if done % PROGRESS_EVERY == 0 && done < total {
            info!(done, total, "delete progress");
        }
    }

    Ok(total)
}
