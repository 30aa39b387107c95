//! Bearer-authenticated API client funnelled through the rate gate

use rate_gate::RateGate;
use reddit_auth::Credential;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

/// Subset of `GET /api/v1/me` used to key stored credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub name: String,
}

/// API client sharing one rate gate with every other outbound caller.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    gate: RateGate,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, gate: RateGate, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            gate,
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}/{path}?{query}` decoded as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self
            .http
            .get(self.url(path))
            .bearer_auth(&credential.access_token)
            .query(query);
        self.send(path, request).await
    }

    /// `POST {base}/{path}` with a form body, decoded as JSON.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(&credential.access_token)
            .form(form);
        self.send(path, request).await
    }

    /// The account the credential belongs to.
    pub async fn me(&self, credential: &Credential) -> Result<Identity> {
        self.get_json(credential, "api/v1/me", &[]).await
    }

    /// Acquire the gate, send, report the headers, then judge the response.
    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let admission = self.gate.acquire().await?;
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("{path}: {e}")))?;
        admission.report(response.headers())?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("{path}: reading body: {e}")))?;
        debug!(path, status = status.as_u16(), "API call completed");

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{path}: {e}")))
    }
}
