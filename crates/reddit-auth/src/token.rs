//! Token exchange and refresh
//!
//! Both grants POST a form to the app's token endpoint with the app
//! id/secret as basic auth, through the shared rate gate. No retries: the
//! caller decides whether a failure is fatal (initial authorization) or
//! recoverable (refreshing one user among many).

use std::time::SystemTime;

use rate_gate::RateGate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::OAuthApp;
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Token endpoint response for both grants.
///
/// `expires_in` is relative seconds. Refresh responses usually omit
/// `refresh_token`, in which case the previous one stays valid.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Exchanges codes and refresh tokens for credentials.
#[derive(Clone)]
pub struct TokenExchanger {
    http: reqwest::Client,
    gate: RateGate,
    app: OAuthApp,
}

impl TokenExchanger {
    pub fn new(http: reqwest::Client, gate: RateGate, app: OAuthApp) -> Self {
        Self { http, gate, app }
    }

    /// Exchange an authorization code for a credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let (response, received_at) = self
            .request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.app.redirect_uri.as_str()),
            ])
            .await?;

        let refresh_token = response.refresh_token.ok_or_else(|| {
            Error::TokenExchange("no refresh_token in response to a permanent grant".into())
        })?;
        info!("authorization code exchanged");
        Ok(Credential::issue(
            response.access_token,
            refresh_token,
            response.expires_in,
            received_at,
        ))
    }

    /// Get a fresh access token from a stored refresh token.
    pub async fn refresh_credential(&self, refresh_token: &str) -> Result<Credential> {
        let (response, received_at) = self
            .request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        let refresh_token = response
            .refresh_token
            .unwrap_or_else(|| refresh_token.to_string());
        debug!("access token refreshed");
        Ok(Credential::issue(
            response.access_token,
            refresh_token,
            response.expires_in,
            received_at,
        ))
    }

    /// POST one grant and decode the response. The receipt time is taken as
    /// soon as the response headers arrive.
    async fn request(&self, form: &[(&str, &str)]) -> Result<(TokenResponse, SystemTime)> {
        let admission = self.gate.acquire().await?;

        let response = self
            .http
            .post(&self.app.token_endpoint)
            .basic_auth(&self.app.client_id, Some(self.app.client_secret.expose()))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("token request failed: {e}")))?;
        let received_at = SystemTime::now();

        admission.report(response.headers())?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading token response: {e}")))?;

        if !status.is_success() {
            return Err(Error::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        // The endpoint reports grant errors with a 200 and an `error` field
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
        if let Some(err) = value.get("error") {
            return Err(Error::TokenExchange(format!(
                "token endpoint rejected grant: {err}"
            )));
        }

        let token = serde_json::from_value(value)
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
        Ok((token, received_at))
    }
}
