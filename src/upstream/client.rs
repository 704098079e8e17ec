//! Single-call upstream client.
//!
//! # Responsibilities
//! - Build one outbound request per call, carrying the inbound headers
//! - Enforce the per-call deadline over send + full body read
//! - Report transport failures as data, distinct from non-2xx statuses
//!
//! # Design Decisions
//! - The pooled hyper client is injected; it holds no request semantics
//! - No retries: a failed call is reported once to the caller

use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;
use crate::upstream::headers;

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Services the gateway talks to. Fan-out results are indexed by this name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Auth,
    Profile,
    Orchestrator,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Auth => "auth",
            Upstream::Profile => "profile",
            Upstream::Orchestrator => "orchestrator",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to one upstream. Built once, consumed by [`UpstreamClient::call`].
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub name: Upstream,
    pub method: Method,
    pub url: String,
    /// Headers of the originating inbound request, copied verbatim.
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamCall {
    pub fn new(name: Upstream, method: Method, url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            name,
            method,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `value` as the body and mark it `application/json`.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.with_body(Bytes::from(body)))
    }
}

/// A fully-formed upstream response, whatever its status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Failures below the HTTP layer. A call that got any status back is never one of these.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Send(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("task ended before reporting: {0}")]
    TaskFailed(String),
}

/// Outcome of exactly one [`UpstreamCall`].
#[derive(Debug, Clone)]
pub struct UpstreamResult {
    pub name: Upstream,
    pub outcome: Result<UpstreamResponse, TransportError>,
}

impl UpstreamResult {
    /// `None` when the call failed at the transport level.
    pub fn status(&self) -> Option<StatusCode> {
        self.outcome.as_ref().ok().map(|r| r.status)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Issues upstream calls over a shared connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(http: Client<HttpConnector, Body>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Client with a fresh connection pool.
    pub fn pooled(timeout: Duration) -> Self {
        let http = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self::new(http, timeout)
    }

    /// Same pool, different deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            http: self.http.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn call(&self, call: UpstreamCall) -> UpstreamResult {
        let start = Instant::now();
        let name = call.name;
        let method = call.method.clone();
        let url = call.url.clone();

        let outcome = match tokio::time::timeout(self.timeout, self.execute(call)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        match &outcome {
            Ok(response) => {
                tracing::debug!(
                    upstream = %name,
                    method = %method,
                    url = %url,
                    status = response.status.as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream call completed"
                );
                metrics::record_upstream_call(name.as_str(), response.status.as_str(), start);
            }
            Err(e) => {
                tracing::warn!(
                    upstream = %name,
                    method = %method,
                    url = %url,
                    error = %e,
                    "Upstream call failed"
                );
                metrics::record_upstream_call(name.as_str(), "transport_error", start);
            }
        }

        UpstreamResult { name, outcome }
    }

    async fn execute(&self, call: UpstreamCall) -> Result<UpstreamResponse, TransportError> {
        let uri: Uri = call
            .url
            .parse()
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", call.url, e)))?;

        let mut builder = Request::builder().method(call.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = headers::for_upstream(&call.headers);
        }
        let body = call.body.map(Body::from).unwrap_or_else(Body::empty);
        let request = builder
            .body(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response: hyper::Response<Incoming> = self
            .http
            .request(request)
            .await
            .map_err(|e| TransportError::Send(describe(&e)))?;

        let (parts, body) = response.into_parts();
        let body = read_body(body).await?;

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

/// Buffer a whole upstream body; the call deadline bounds how long this may take.
async fn read_body(body: Incoming) -> Result<Bytes, TransportError> {
    axum::body::to_bytes(Body::new(body), usize::MAX)
        .await
        .map_err(|e| TransportError::Body(e.to_string()))
}

/// Error message including its source chain (hyper's top-level messages are terse).
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
