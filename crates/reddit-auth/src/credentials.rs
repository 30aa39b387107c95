//! Credential storage keyed by username
//!
//! The file is a JSON object from username to [`Credential`]. It is owned
//! by this process for the length of a run: read at startup, then rewritten
//! whenever an authorization or refresh produces new tokens.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One user's tokens.
///
/// `expiration` is an absolute unix timestamp in seconds, stamped once from
/// the token response's relative `expires_in` and the time the response was
/// received. It is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expiration: u64,
}

impl Credential {
    /// Stamp a credential from a token response received at `received_at`.
    pub fn issue(
        access_token: String,
        refresh_token: String,
        expires_in: u64,
        received_at: SystemTime,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expiration: unix_secs(received_at).saturating_add(expires_in),
        }
    }

    /// Whether the access token expires within `threshold` of `now`.
    pub fn expires_within(&self, threshold: Duration, now: SystemTime) -> bool {
        self.expiration <= unix_secs(now).saturating_add(threshold.as_secs())
    }
}

fn unix_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Username-keyed credential file, read once and rewritten on every upsert.
pub struct CredentialStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Credential>>,
}

impl CredentialStore {
    /// Read `path`. A missing file is an empty store; nothing is written
    /// until the first upsert.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Credential>>(&bytes)
                .map_err(|e| Error::CredentialParse(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Io(format!("reading {}: {e}", path.display()))),
        };
        info!(path = %path.display(), users = entries.len(), "credential store ready");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub async fn get(&self, username: &str) -> Option<Credential> {
        self.entries.lock().await.get(username).cloned()
    }

    /// Set `username`'s credential and persist the whole map. The lock is
    /// held across the write so concurrent upserts land in order.
    pub async fn upsert(&self, username: &str, credential: Credential) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(username.to_owned(), credential);
        persist(&self.path, &entries).await?;
        debug!(username, "credential persisted");
        Ok(())
    }
}

/// Replace `path` with the serialized map. The bytes go to `<path>.tmp`,
/// created owner-only, and are synced before the rename.
async fn persist(path: &Path, entries: &BTreeMap<String, Credential>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(entries)
        .map_err(|e| Error::CredentialParse(format!("encoding credentials: {e}")))?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    let io_err =
        |what: &str, e: std::io::Error| Error::Io(format!("{what} {}: {e}", staging.display()));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&staging)
        .await
        .map_err(|e| io_err("opening", e))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| io_err("writing", e))?;
    file.sync_all().await.map_err(|e| io_err("syncing", e))?;
    drop(file);

    tokio::fs::rename(&staging, path)
        .await
        .map_err(|e| io_err("renaming", e))
}
