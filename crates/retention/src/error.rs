//! Error types for API calls and sweeps

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid API response: {0}")]
    Decode(String),

    #[error("invalid retention duration: {0}")]
    InvalidDuration(String),

    #[error("deletion aborted after {deleted}/{total} entries: {source}")]
    DeleteAborted {
        deleted: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    RateLimit(#[from] rate_gate::Error),
}

impl Error {
    /// Whether the error must stop the whole run rather than just the
    /// current user. Only rate-limit protocol failures qualify.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::RateLimit(_) => true,
            Error::DeleteAborted { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Result alias for retention operations.
pub type Result<T> = std::result::Result<T, Error>;
