//! Recommendation service gateway
//!
//! Boundary for the remote calls the client depends on. Transport failures,
//! non-2xx responses and malformed bodies all come back as [`GatewayError`];
//! nothing here panics on bad input from the wire.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use wander_common::models::{
    Destination, EncoderOptions, NormalizedQuery, PredictRequest, ServiceHealth,
};

const USER_AGENT: &str = concat!("wander/", env!("CARGO_PKG_VERSION"));

/// Shown when neither the server nor the HTTP status says anything useful
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get recommendations. Please try again.";

/// Shown when `/predict` answers 2xx with something other than a JSON array
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid response format from server";

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Text to surface to the user
    ///
    /// Prefers the server-supplied message, then the HTTP status, then a
    /// generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Api { message, .. } => message.clone(),
            GatewayError::Protocol(message) => message.clone(),
            GatewayError::Network(_) | GatewayError::Timeout(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// Remote calls the orchestrator needs
#[async_trait]
pub trait RecommendationGateway: Send + Sync {
    /// `GET /encoders`
    async fn fetch_encoders(&self) -> Result<EncoderOptions, GatewayError>;

    /// `POST /predict`
    async fn recommend(
        &self,
        query: &NormalizedQuery,
        top_k: u32,
    ) -> Result<Vec<Destination>, GatewayError>;

    /// `GET /states?country=...`
    async fn fetch_states(&self, country: &str) -> Result<Vec<String>, GatewayError>;

    /// `GET /health`
    async fn health(&self) -> Result<ServiceHealth, GatewayError>;
}

/// reqwest-backed gateway
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway for `base_url`, bounding every call by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Network(e.to_string())
        }
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::debug!(status = status.as_u16(), message = %message, "Service returned error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl RecommendationGateway for HttpGateway {
    async fn fetch_encoders(&self) -> Result<EncoderOptions, GatewayError> {
        let url = self.url("/encoders");
        tracing::debug!(url = %url, "Fetching encoder options");
        self.get_json(self.http_client.get(&url)).await
    }

    async fn recommend(
        &self,
        query: &NormalizedQuery,
        top_k: u32,
    ) -> Result<Vec<Destination>, GatewayError> {
        let url = self.url("/predict");
        tracing::debug!(url = %url, top_k, "Requesting recommendations");

        // .json() sets Content-Type: application/json
        let request = self
            .http_client
            .post(&url)
            .json(&PredictRequest { query, top_k });
        let body = self.send(request).await?;

        let results = parse_destinations(&body)?;
        tracing::info!(count = results.len(), "Received recommendations");
        Ok(results)
    }

    async fn fetch_states(&self, country: &str) -> Result<Vec<String>, GatewayError> {
        let url = self.url("/states");
        tracing::debug!(url = %url, country = %country, "Fetching region list");
        self.get_json(self.http_client.get(&url).query(&[("country", country)]))
            .await
    }

    async fn health(&self) -> Result<ServiceHealth, GatewayError> {
        let url = self.url("/health");
        self.get_json(self.http_client.get(&url)).await
    }
}

/// Parse a `/predict` body, insisting on a JSON array
fn parse_destinations(body: &str) -> Result<Vec<Destination>, GatewayError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Unparseable recommendation body: {}", e);
        GatewayError::Protocol(INVALID_FORMAT_MESSAGE.to_string())
    })?;

    if !value.is_array() {
        tracing::warn!("Recommendation body is not an array");
        return Err(GatewayError::Protocol(INVALID_FORMAT_MESSAGE.to_string()));
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::warn!("Malformed destination record: {}", e);
        GatewayError::Protocol(format!("{}: {}", INVALID_FORMAT_MESSAGE, e))
    })
}

/// Message for a non-2xx response
///
/// A JSON body's `detail` or `message` wins. A JSON body without either gives
/// `HTTP error! status: N`; a non-JSON body gives the status reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    let status_line = || format!("HTTP error! status: {}", status.as_u16());

    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("detail")
            .and_then(message_text)
            .or_else(|| value.get("message").and_then(message_text))
            .unwrap_or_else(status_line),
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(status_line),
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        // FastAPI validation errors put a list of objects in `detail`
        other => Some(other.to_string()),
    }
}
