//! In-process stand-in for the API used by this crate's tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rate_gate::RateGate;
use reddit_auth::Credential;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::client::ApiClient;

/// The only account the mock knows. Overviews of anyone else are 404.
pub const MOCK_USER: &str = "alice";

#[derive(Default)]
pub struct MockApi {
    /// Overview pages keyed by the `after` cursor that requests them; the
    /// first page is keyed by the empty string.
    pub pages: HashMap<String, Value>,
    /// Ids whose delete returns 500.
    pub fail_ids: HashSet<String>,
    pub omit_rate_headers: bool,
}

impl MockApi {
    pub fn page(mut self, after: Option<&str>, children: Vec<Value>, next: Option<&str>) -> Self {
        self.pages.insert(
            after.unwrap_or_default().to_string(),
            json!({"kind": "Listing", "data": {"after": next, "children": children}}),
        );
        self
    }

    pub fn fail_delete(mut self, id: &str) -> Self {
        self.fail_ids.insert(id.to_string());
        self
    }

    pub async fn start(self) -> RunningMock {
        let state = Arc::new(MockState {
            config: self,
            attempts: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            overview_requests: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/api/v1/me", get(me))
            .route("/user/{username}/overview", get(overview))
            .route("/api/del", post(delete))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningMock {
            base_url: format!("http://{addr}"),
            state,
        }
    }
}

pub struct RunningMock {
    pub base_url: String,
    state: Arc<MockState>,
}

impl RunningMock {
    pub fn client(&self, gate: RateGate) -> ApiClient {
        ApiClient::new(reqwest::Client::new(), gate, self.base_url.clone())
    }

    /// Ids successfully deleted, in request order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.deleted.lock().unwrap().clone()
    }

    /// Every id a delete was attempted for, failures included.
    pub fn delete_attempts(&self) -> Vec<String> {
        self.state.attempts.lock().unwrap().clone()
    }

    pub fn overview_requests(&self) -> usize {
        self.state.overview_requests.load(Ordering::SeqCst)
    }
}

struct MockState {
    config: MockApi,
    attempts: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    overview_requests: AtomicUsize,
}

impl MockState {
    fn respond(&self, status: StatusCode, body: Value) -> Response {
        let mut headers = HeaderMap::new();
        if !self.config.omit_rate_headers {
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("100.0"));
            headers.insert("x-ratelimit-reset", HeaderValue::from_static("300"));
        }
        (status, headers, Json(body)).into_response()
    }
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer"))
        .is_some_and(|token| !token.trim().is_empty())
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !has_bearer(&headers) {
        return state.respond(StatusCode::UNAUTHORIZED, json!({"error": 401}));
    }
    state.respond(StatusCode::OK, json!({"name": MOCK_USER}))
}

async fn overview(
    State(state): State<Arc<MockState>>,
    Path(username): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.overview_requests.fetch_add(1, Ordering::SeqCst);
    if username != MOCK_USER {
        return state.respond(StatusCode::NOT_FOUND, json!({"error": 404}));
    }
    let after = query.get("after").cloned().unwrap_or_default();
    let page = state
        .config
        .pages
        .get(&after)
        .cloned()
        .unwrap_or_else(|| json!({"kind": "Listing", "data": {"after": null, "children": []}}));
    state.respond(StatusCode::OK, page)
}

async fn delete(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let id = form.get("id").cloned().unwrap_or_default();
    state.attempts.lock().unwrap().push(id.clone());
    if state.config.fail_ids.contains(&id) {
        return state.respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": 500}));
    }
    state.deleted.lock().unwrap().push(id);
    state.respond(StatusCode::OK, json!({}))
}

/// One overview child as the listing serves it.
pub fn entry(kind: &str, name: &str, created_utc: u64) -> Value {
    json!({
        "kind": kind,
        "data": {
            "name": name,
            "created": created_utc as f64,
            "created_utc": created_utc as f64,
        }
    })
}

pub fn credential() -> Credential {
    Credential {
        access_token: "at_test".into(),
        refresh_token: "rt_test".into(),
        expiration: u64::MAX,
    }
}
