//! Error types for the rate gate

/// Rate-limit protocol failures.
///
/// All variants are process-fatal: the gate has no fallback pacing and
/// closes itself after the first protocol error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("response is missing rate-limit header {0}")]
    MissingHeader(&'static str),

    #[error("malformed rate-limit header {header}: {value:?}")]
    MalformedHeader { header: &'static str, value: String },

    #[error("rate gate closed after an earlier rate-limit protocol error")]
    Closed,
}

/// Result alias for gate operations.
pub type Result<T> = std::result::Result<T, Error>;
