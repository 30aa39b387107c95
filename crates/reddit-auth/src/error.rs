//! Error types for authorization and token operations

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: redirect state does not match this attempt")]
    AuthenticationMismatch,

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("redirect carried neither an authorization code nor an error")]
    MissingCode,

    #[error("callback listener failed to start: {0}")]
    ListenerStartup(String),

    #[error("callback listener failed to shut down: {0}")]
    ListenerShutdown(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error(transparent)]
    RateLimit(#[from] rate_gate::Error),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether the error must stop the whole process no matter which
    /// workflow hit it. Only rate-limit protocol failures qualify; every
    /// other error is judged by the caller's phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::RateLimit(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
