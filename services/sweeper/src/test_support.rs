//! In-process stand-in for the token endpoint and the API

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use common::Secret;
use rate_gate::{GateConfig, RateGate};
use reddit_auth::OAuthApp;
use retention::ApiClient;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Token endpoint behaviour:
/// - authorization_code "good" → `at_alice` / `rt_alice`
/// - refresh_token "rt_revoked" → 500
/// - refresh_token "rt_no_headers" → 200 without rate-limit headers
/// - refresh_token "rt_X" → `at_X_fresh`, no new refresh token
///
/// API behaviour:
/// - `api/v1/me` → `alice`
/// - overviews serve the configured history in one page
/// - deletes of ids containing "fail" → 500
pub struct MockPlatform {
    base_url: String,
    state: Arc<PlatformState>,
}

struct PlatformState {
    history: HashMap<String, Vec<Value>>,
    bearers: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
    token_requests: AtomicUsize,
}

impl MockPlatform {
    pub async fn start() -> Self {
        Self::start_with(HashMap::new()).await
    }

    pub async fn start_with(history: HashMap<String, Vec<Value>>) -> Self {
        let state = Arc::new(PlatformState {
            history,
            bearers: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
            token_requests: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/api/v1/access_token", post(token))
            .route("/api/v1/me", get(me))
            .route("/user/{username}/overview", get(overview))
            .route("/api/del", post(delete))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn app(&self, redirect_uri: &str) -> OAuthApp {
        OAuthApp::new("client", Secret::new("secret".into()), redirect_uri).with_endpoints(
            format!("{}/api/v1/authorize", self.base_url),
            format!("{}/api/v1/access_token", self.base_url),
        )
    }

    pub fn api(&self, gate: RateGate) -> ApiClient {
        ApiClient::new(reqwest::Client::new(), gate, self.base_url.clone())
    }

    /// Bearer token last used to list `username`'s overview.
    pub fn bearer_for(&self, username: &str) -> Option<String> {
        self.state.bearers.lock().unwrap().get(username).cloned()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.deleted.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }
}

fn rate_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("100.0"));
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("300"));
    headers
}

fn respond(status: StatusCode, body: Value) -> Response {
    (status, rate_headers(), Json(body)).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn token(
    State(state): State<Arc<PlatformState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let grant = form.get("grant_type").map(String::as_str);
    match grant {
        Some("authorization_code") if form.get("code").is_some_and(|c| c == "good") => respond(
            StatusCode::OK,
            json!({"access_token": "at_alice", "refresh_token": "rt_alice", "expires_in": 3600}),
        ),
        Some("refresh_token") => match form.get("refresh_token").map(String::as_str) {
            Some("rt_revoked") | None => {
                respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": 500}))
            }
            Some("rt_no_headers") => {
                Json(json!({"access_token": "at", "expires_in": 3600})).into_response()
            }
            Some(refresh) => {
                let user = refresh.trim_start_matches("rt_");
                respond(
                    StatusCode::OK,
                    json!({"access_token": format!("at_{user}_fresh"), "expires_in": 3600}),
                )
            }
        },
        _ => respond(StatusCode::OK, json!({"error": "invalid_grant"})),
    }
}

async fn me(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(_) => respond(StatusCode::OK, json!({"name": "alice"})),
        None => respond(StatusCode::UNAUTHORIZED, json!({"error": 401})),
    }
}

async fn overview(
    State(state): State<Arc<PlatformState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = bearer(&headers) {
        state
            .bearers
            .lock()
            .unwrap()
            .insert(username.clone(), token);
    }
    let children = state.history.get(&username).cloned().unwrap_or_default();
    respond(
        StatusCode::OK,
        json!({"kind": "Listing", "data": {"after": null, "children": children}}),
    )
}

async fn delete(
    State(state): State<Arc<PlatformState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let id = form.get("id").cloned().unwrap_or_default();
    if id.contains("fail") {
        return respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": 500}));
    }
    state.deleted.lock().unwrap().push(id);
    respond(StatusCode::OK, json!({}))
}

pub fn entry(kind: &str, name: &str, created_utc: u64) -> Value {
    json!({"kind": kind, "data": {"name": name, "created_utc": created_utc as f64}})
}

pub fn gate() -> RateGate {
    RateGate::new(GateConfig::default())
}

/// A port that was free a moment ago.
pub fn reserve_port() -> u16 {
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    reserved.local_addr().unwrap().port()
}
