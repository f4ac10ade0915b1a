//! In-process stand-in for the recommendation service
//!
//! Serves `/encoders`, `/predict`, `/states` and `/health` from canned
//! responses and records what the client sent. Paths without a canned
//! response answer 404 with a FastAPI-style `{"detail": "Not Found"}`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned response for one path
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: body.to_string(),
            delay: None,
        }
    }

    /// Hold the response back for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A `/predict` call as received
#[derive(Debug, Clone)]
pub struct RecordedPredict {
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    responses: Arc<Mutex<HashMap<&'static str, MockResponse>>>,
    predicts: Arc<Mutex<Vec<RecordedPredict>>>,
    state_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockState {
    async fn reply(&self, path: &'static str) -> Response {
        let canned = self.responses.lock().unwrap().get(path).cloned();
        let Some(canned) = canned else {
            return (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"detail":"Not Found"}"#,
            )
                .into_response();
        };

        if let Some(delay) = canned.delay {
            tokio::time::sleep(delay).await;
        }

        (
            canned.status,
            [(header::CONTENT_TYPE, canned.content_type)],
            canned.body,
        )
            .into_response()
    }
}

async fn encoders(State(state): State<MockState>) -> Response {
    state.reply("/encoders").await
}

async fn predict(State(state): State<MockState>, headers: HeaderMap, body: String) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    state
        .predicts
        .lock()
        .unwrap()
        .push(RecordedPredict { content_type, body });
    state.reply("/predict").await
}

async fn states(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.state_queries.lock().unwrap().push(query);
    state.reply("/states").await
}

async fn health(State(state): State<MockState>) -> Response {
    state.reply("/health").await
}

/// Running mock service
pub struct MockService {
    base_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockService {
    /// Bind an ephemeral port on 127.0.0.1 and start serving
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/encoders", get(encoders))
            .route("/predict", post(predict))
            .route("/states", get(states))
            .route("/health", get(health))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock service");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answer `path` with `response` from now on
    pub fn respond(&self, path: &'static str, response: MockResponse) {
        self.state.responses.lock().unwrap().insert(path, response);
    }

    pub fn predicts(&self) -> Vec<RecordedPredict> {
        self.state.predicts.lock().unwrap().clone()
    }

    pub fn state_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.state_queries.lock().unwrap().clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
