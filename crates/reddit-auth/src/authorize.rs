//! Authorization URL construction and the interactive flow

use std::net::SocketAddr;

use reqwest::Url;
use tracing::info;

use crate::app::OAuthApp;
use crate::callback::CallbackListener;
use crate::constants::{SCOPES, TOKEN_DURATION};
use crate::error::{Error, Result};
use crate::state::generate_state;

/// Build the browser-facing authorization URL carrying `state`.
pub fn build_authorization_url(app: &OAuthApp, state: &str) -> Result<String> {
    let url = Url::parse_with_params(
        &app.authorize_endpoint,
        &[
            ("client_id", app.client_id.as_str()),
            ("response_type", "code"),
            ("state", state),
            ("redirect_uri", app.redirect_uri.as_str()),
            ("duration", TOKEN_DURATION),
            ("scope", SCOPES),
        ],
    )
    .map_err(|e| Error::InvalidEndpoint(format!("{}: {e}", app.authorize_endpoint)))?;
    Ok(url.into())
}

/// Run one interactive authorization attempt and return the code.
///
/// Binds the callback listener on `bind_addr` before handing the URL to
/// `launch` (which opens a browser or prints the URL), so the redirect can
/// never arrive before the listener is up. Every failure is final: a human
/// has to redo the browser step for a new attempt.
pub async fn await_authorization<F>(
    app: &OAuthApp,
    bind_addr: SocketAddr,
    launch: F,
) -> Result<String>
where
    F: FnOnce(&str),
{
    let state = generate_state();
    let url = build_authorization_url(app, &state)?;
    let listener = CallbackListener::bind(bind_addr).await?;

    info!(addr = %listener.local_addr(), "waiting for authorization redirect");
    launch(&url);

    listener.wait(&state).await
}
