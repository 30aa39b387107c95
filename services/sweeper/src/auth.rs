//! `auth` command: authorize one account interactively and store its tokens

use reddit_auth::{CredentialStore, OAuthApp, TokenExchanger, await_authorization};
use retention::ApiClient;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::error::Result;

/// Print the authorization URL and try to open it in a browser.
pub fn launch_browser(url: &str) {
    println!("Open this URL to authorize the app:\n\n    {url}\n");
    if let Err(e) = open::that(url) {
        warn!(error = %e, "could not open a browser, use the printed URL");
    }
}

/// Run the code flow, exchange the code and store the credential under the
/// account's username. Returns that username.
pub async fn authorize_account<F>(
    app: &OAuthApp,
    serve_address: SocketAddr,
    exchanger: &TokenExchanger,
    api: &ApiClient,
    store: &CredentialStore,
    launch: F,
) -> Result<String>
where
    F: FnOnce(&str),
{
    let code = await_authorization(app, serve_address, launch).await?;
    let credential = exchanger.exchange_code(&code).await?;
    let identity = api.me(&credential).await?;

    store.upsert(&identity.name, credential).await?;
    info!(username = %identity.name, "account authorized");
    Ok(identity.name)
}
