//! Stats API client.
//!
//! The breakdown needs exactly one endpoint:
//! `GET /api/stats/{domain}/property/{prop_key}?period=...&filters=...`, which
//! returns a JSON array of [`BreakdownRow`]s. The [`StatsApi`] trait keeps the
//! transport injectable so the fetch lifecycle can be driven by fakes in tests.

use crate::config::{API_BASE_PATH, FETCH_TIMEOUT_MS};
use crate::query::Query;
use crate::BreakdownRow;
use futures::future::{self, Either, LocalBoxFuture};
use futures::FutureExt;
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use log::debug;
use serde::Deserialize;
use std::fmt;

/// Stats API failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never produced a response.
    Network(String),
    /// Non-2xx response, with the server's error message when it sent one.
    Status { status: u16, message: String },
    /// The body was not the expected JSON.
    Decode(String),
    /// No response within the configured timeout.
    TimedOut(u32),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Status { status, message } if message.is_empty() => {
                write!(f, "HTTP error {}", status)
            }
            ApiError::Status { status, message } => write!(f, "HTTP error {}: {}", status, message),
            ApiError::Decode(msg) => write!(f, "Failed to parse response: {}", msg),
            ApiError::TimedOut(ms) => write!(f, "Request timed out after {} ms", ms),
        }
    }
}

impl std::error::Error for ApiError {}

/// Body of an error response, e.g. `{"error": "Site not found"}`.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Source of property breakdowns.
pub trait StatsApi {
    fn prop_breakdown(
        &self,
        domain: &str,
        prop_key: &str,
        query: &Query,
    ) -> LocalBoxFuture<'static, Result<Vec<BreakdownRow>, ApiError>>;
}

/// Request path (including query string) for a property breakdown.
pub fn prop_breakdown_url(base: &str, domain: &str, prop_key: &str, query: &Query) -> String {
    format!(
        "{}/{}/property/{}{}",
        base.trim_end_matches('/'),
        urlencoding::encode(domain),
        urlencoding::encode(prop_key),
        query.to_api_params()
    )
}

/// Decode a response body, mapping non-2xx statuses to [`ApiError::Status`].
pub fn decode_breakdown(status: u16, body: &str) -> Result<Vec<BreakdownRow>, ApiError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .map(|p| p.error)
            .unwrap_or_default();
        return Err(ApiError::Status { status, message });
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// `gloo-net` backed client for the dashboard's stats API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpStatsApi {
    base: String,
    timeout_ms: u32,
}

impl Default for HttpStatsApi {
    fn default() -> Self {
        Self::new(API_BASE_PATH)
    }
}

impl HttpStatsApi {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            timeout_ms: FETCH_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

async fn get_rows(url: String) -> Result<Vec<BreakdownRow>, ApiError> {
    let response = Request::get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    decode_breakdown(status, &body)
}

impl StatsApi for HttpStatsApi {
    fn prop_breakdown(
        &self,
        domain: &str,
        prop_key: &str,
        query: &Query,
    ) -> LocalBoxFuture<'static, Result<Vec<BreakdownRow>, ApiError>> {
        let url = prop_breakdown_url(&self.base, domain, prop_key, query);
        let timeout_ms = self.timeout_ms;
        debug!("GET {}", url);

        async move {
            let request = Box::pin(get_rows(url));
            let timeout = Box::pin(TimeoutFuture::new(timeout_ms));
            match future::select(request, timeout).await {
                Either::Left((result, _)) => result,
                Either::Right(((), _)) => Err(ApiError::TimedOut(timeout_ms)),
            }
        }
        .boxed_local()
    }
}
