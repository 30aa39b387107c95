//! One-shot callback listener for the authorization redirect
//!
//! Binds an ephemeral HTTP server, serves exactly one redirect and shuts
//! itself down. Three tasks cooperate:
//!
//! - the axum server, whose handler owns a [`CallbackState`] and performs the
//!   single `AwaitingRedirect -> Completed` transition
//! - a shutdown watcher, woken by the completion signal, which triggers
//!   graceful shutdown and enforces [`SHUTDOWN_GRACE`]
//! - the caller, blocked in [`CallbackListener::wait`] on the outcome signal
//!
//! The handler signals completion before returning its response; graceful
//! shutdown lets that in-flight response flush before the server stops.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Bound on graceful shutdown after the redirect has been served.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Body returned to the browser whatever the outcome.
pub const CONFIRMATION_PAGE: &str = "<html>\n  <p>You can now close this window</p>\n</html>\n";

/// Raw values read from the redirect's query string. Absent values are empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub error: String,
    pub code: String,
    pub state: String,
}

impl CallbackParams {
    /// Pick `error`, `code` and `state` out of decoded query pairs. The first
    /// occurrence of a key wins and unknown keys are ignored, so no query
    /// string is ever rejected.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (mut error, mut code, mut state) = (None, None, None);
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "error" => &mut error,
                "code" => &mut code,
                "state" => &mut state,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        Self {
            error: error.unwrap_or_default(),
            code: code.unwrap_or_default(),
            state: state.unwrap_or_default(),
        }
    }
}

/// What the platform sent back: a code or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Code(String),
    Error(String),
}

/// The redirect's result plus the echoed correlation secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOutcome {
    pub result: AuthorizationResult,
    pub state: String,
}

impl From<CallbackParams> for AuthorizationOutcome {
    /// A non-empty `error` wins over any `code` sent alongside it.
    fn from(params: CallbackParams) -> Self {
        let result = if params.error.is_empty() {
            AuthorizationResult::Code(params.code)
        } else {
            AuthorizationResult::Error(params.error)
        };
        Self {
            result,
            state: params.state,
        }
    }
}

impl AuthorizationOutcome {
    /// Check the echoed secret, then unwrap the code.
    ///
    /// A mismatched secret is rejected before anything else is looked at.
    pub fn validate(self, expected_state: &str) -> Result<String> {
        if self.state != expected_state {
            return Err(Error::AuthenticationMismatch);
        }
        match self.result {
            AuthorizationResult::Error(reason) => Err(Error::AuthorizationDenied(reason)),
            AuthorizationResult::Code(code) if code.is_empty() => Err(Error::MissingCode),
            AuthorizationResult::Code(code) => Ok(code),
        }
    }
}

/// Handler-side state machine.
///
/// Transitions:
/// - AwaitingRedirect → Completed (first request: publish outcome, signal shutdown)
/// - Completed → Completed (later requests are answered but ignored)
pub enum CallbackState {
    AwaitingRedirect {
        outcome_tx: oneshot::Sender<AuthorizationOutcome>,
        completed_tx: oneshot::Sender<()>,
    },
    Completed,
}

impl CallbackState {
    pub fn new(
        outcome_tx: oneshot::Sender<AuthorizationOutcome>,
        completed_tx: oneshot::Sender<()>,
    ) -> Self {
        Self::AwaitingRedirect {
            outcome_tx,
            completed_tx,
        }
    }

    /// Perform the completion transition. Returns `false` if the state had
    /// already completed, in which case `outcome` is discarded.
    pub fn complete(&mut self, outcome: AuthorizationOutcome) -> bool {
        match std::mem::replace(self, Self::Completed) {
            Self::AwaitingRedirect {
                outcome_tx,
                completed_tx,
            } => {
                // A dropped receiver means the caller gave up; nothing to do
                let _ = outcome_tx.send(outcome);
                let _ = completed_tx.send(());
                true
            }
            Self::Completed => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

type SharedState = Arc<Mutex<CallbackState>>;

/// Any path, any method: the redirect URI's path is not interpreted.
fn build_router(state: SharedState) -> Router {
    Router::new()
        .fallback(handle_redirect)
        .layer(tower::limit::ConcurrencyLimitLayer::new(1))
        .with_state(state)
}

async fn handle_redirect(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Html<&'static str> {
    // Percent-decoding is lossy, so this extractor cannot fail
    let params = CallbackParams::from_pairs(pairs);
    let completed = state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .complete(params.into());

    if completed {
        info!("authorization redirect received");
    } else {
        warn!("ignoring request after the authorization redirect was already handled");
    }
    Html(CONFIRMATION_PAGE)
}

/// A bound callback listener for a single authorization attempt.
pub struct CallbackListener {
    local_addr: SocketAddr,
    outcome_rx: oneshot::Receiver<AuthorizationOutcome>,
    watcher: JoinHandle<Result<()>>,
}

impl CallbackListener {
    /// Bind on `addr` with the default shutdown grace.
    ///
    /// Binding failures (address in use, permission denied) are returned as
    /// `ListenerStartup`; there is no retry.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_grace(addr, SHUTDOWN_GRACE).await
    }

    pub async fn bind_with_grace(addr: SocketAddr, grace: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ListenerStartup(format!("binding {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::ListenerStartup(format!("reading bound address: {e}")))?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (completed_tx, completed_rx) = oneshot::channel();
        let state = Arc::new(Mutex::new(CallbackState::new(outcome_tx, completed_tx)));
        let app = build_router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let watcher = tokio::spawn(watch_shutdown(completed_rx, shutdown_tx, server, grace));

        info!(addr = %local_addr, "callback listener ready");
        Ok(Self {
            local_addr,
            outcome_rx,
            watcher,
        })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the redirect arrives and the listener has shut down, then
    /// validate the outcome against `expected_state` and return the code.
    pub async fn wait(self, expected_state: &str) -> Result<String> {
        let outcome = self.outcome_rx.await;
        let shutdown = self
            .watcher
            .await
            .map_err(|e| Error::ListenerShutdown(format!("shutdown watcher failed: {e}")))?;
        shutdown?;

        let outcome = outcome.map_err(|_| {
            Error::ListenerStartup("listener stopped before a redirect arrived".into())
        })?;
        outcome.validate(expected_state)
    }
}

/// Wait for the completion signal, then stop the server within `grace`.
async fn watch_shutdown(
    completed_rx: oneshot::Receiver<()>,
    shutdown_tx: oneshot::Sender<()>,
    mut server: JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<()> {
    if completed_rx.await.is_err() {
        // The router (and with it the state) was dropped: the server exited
        // before serving the redirect.
        return match server.await {
            Ok(Err(e)) => Err(Error::ListenerStartup(format!("server error: {e}"))),
            Err(e) => Err(Error::ListenerStartup(format!("server task failed: {e}"))),
            Ok(Ok(())) => Err(Error::ListenerStartup(
                "server exited before a redirect arrived".into(),
            )),
        };
    }

    debug!("redirect handled, shutting down callback listener");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(Ok(Ok(()))) => {
            debug!("callback listener stopped");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(Error::ListenerShutdown(format!("server error: {e}"))),
        Ok(Err(e)) => Err(Error::ListenerShutdown(format!("server task failed: {e}"))),
        Err(_) => {
            server.abort();
            Err(Error::ListenerShutdown(format!(
                "still running {grace:?} after the redirect"
            )))
        }
    }
}
