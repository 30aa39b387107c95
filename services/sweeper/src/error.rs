//! Operator-facing error taxonomy
//!
//! Library errors are folded into six kinds. Whether a kind ends the process
//! depends on the phase: authorization has a human in the loop and no retry
//! path, so everything there is fatal; a run isolates failures per user.

use thiserror::Error;

/// Which workflow hit the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authorization,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Stop the process with a non-zero exit.
    Fatal,
    /// Log, skip the current user, carry on.
    PerUser,
}

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("authentication mismatch: {0}")]
    AuthenticationMismatch(String),

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("callback listener failure: {0}")]
    ListenerStartupFailure(String),

    #[error("rate-limit protocol error: {0}")]
    RateLimitProtocolError(String),

    #[error("token exchange failure: {0}")]
    TokenExchangeFailure(String),

    #[error("API call failure: {0}")]
    ApiCallFailure(String),
}

impl Error {
    pub fn severity(&self, phase: Phase) -> Severity {
        match (self, phase) {
            (Error::RateLimitProtocolError(_), _) => Severity::Fatal,
            (Error::ListenerStartupFailure(_), _) => Severity::Fatal,
            (_, Phase::Authorization) => Severity::Fatal,
            (_, Phase::Run) => Severity::PerUser,
        }
    }
}

impl From<reddit_auth::Error> for Error {
    fn from(err: reddit_auth::Error) -> Self {
        use reddit_auth::Error as E;
        match err {
            E::AuthenticationMismatch => {
                Error::AuthenticationMismatch("redirect state does not match this attempt".into())
            }
            E::AuthorizationDenied(reason) => Error::AuthorizationDenied(reason),
            E::MissingCode => Error::AuthorizationDenied(E::MissingCode.to_string()),
            E::ListenerStartup(msg) | E::ListenerShutdown(msg) => Error::ListenerStartupFailure(msg),
            E::RateLimit(e) => Error::RateLimitProtocolError(e.to_string()),
            E::TokenExchange(msg) | E::Http(msg) | E::InvalidEndpoint(msg) => {
                Error::TokenExchangeFailure(msg)
            }
            other @ (E::CredentialParse(_) | E::Io(_)) => {
                Error::ApiCallFailure(other.to_string())
            }
        }
    }
}

impl From<retention::Error> for Error {
    fn from(err: retention::Error) -> Self {
        if err.is_fatal() {
            Error::RateLimitProtocolError(err.to_string())
        } else {
            Error::ApiCallFailure(err.to_string())
        }
    }
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
