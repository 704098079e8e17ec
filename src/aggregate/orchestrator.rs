//! Unified user operations composed from the auth and profile services.
//!
//! # Unified read
//! ```text
//! credential check → fan-out GET auth + GET profile → join
//!     auth transport failure  → 503
//!     auth non-200            → auth's status + body relayed
//!     auth 200                → parse, overlay profile data (if 200), 200
//! ```
//!
//! # Unified update
//! ```text
//! credential check → parse body → partition by allow-list
//!     → fan-out PATCH auth / PUT profile (only non-empty parts) → join
//!     any failure → 500 "Partial update failed: ..." (no rollback)
//!     all ok      → unified read of the fresh state
//! ```

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::aggregate::error::{GatewayError, Result};
use crate::aggregate::events::EventPublisher;
use crate::aggregate::fields::partition;
use crate::aggregate::merge::merge;
use crate::config::UpstreamsConfig;
use crate::upstream::{
    fan_out, TransportError, Upstream, UpstreamCall, UpstreamClient, UpstreamResponse,
    UpstreamResult,
};

/// Parsed base URLs of every upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamUrls {
    auth: Url,
    profile: Url,
    orchestrator: Url,
}

impl UpstreamUrls {
    pub fn from_config(config: &UpstreamsConfig) -> std::result::Result<Self, url::ParseError> {
        Ok(Self {
            auth: Url::parse(&config.auth_url)?,
            profile: Url::parse(&config.profile_url)?,
            orchestrator: Url::parse(&config.orchestrator_url)?,
        })
    }

    pub fn base(&self, upstream: Upstream) -> &Url {
        match upstream {
            Upstream::Auth => &self.auth,
            Upstream::Profile => &self.profile,
            Upstream::Orchestrator => &self.orchestrator,
        }
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment.
    pub fn endpoint(&self, upstream: Upstream, segments: &[&str]) -> Url {
        let mut url = self.base(upstream).clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Entry point for every operation that touches upstream services.
#[derive(Clone)]
pub struct Aggregator {
    client: UpstreamClient,
    urls: UpstreamUrls,
    events: EventPublisher,
}

impl Aggregator {
    /// `client`'s pool is shared; its deadline is replaced by the configured one.
    pub fn new(
        client: &UpstreamClient,
        config: &UpstreamsConfig,
    ) -> std::result::Result<Self, url::ParseError> {
        let client = client.with_timeout(Duration::from_secs(config.timeout_secs));
        let urls = UpstreamUrls::from_config(config)?;
        let events = EventPublisher::new(
            client.clone(),
            urls.base(Upstream::Orchestrator).as_str(),
        );
        Ok(Self {
            client,
            urls,
            events,
        })
    }

    pub fn urls(&self) -> &UpstreamUrls {
        &self.urls
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Merged auth + profile view of one user.
    pub async fn unified_read(&self, username: &str, headers: &HeaderMap) -> Result<Value> {
        require_credential(headers)?;

        let calls = vec![
            UpstreamCall::new(
                Upstream::Auth,
                Method::GET,
                self.urls.endpoint(Upstream::Auth, &["accounts", username]),
                headers.clone(),
            ),
            UpstreamCall::new(
                Upstream::Profile,
                Method::GET,
                self.urls.endpoint(Upstream::Profile, &["profiles", username]),
                headers.clone(),
            ),
        ];
        let mut results = fan_out(&self.client, calls).await;

        let auth = outcome_of(results.take(Upstream::Auth), Upstream::Auth)
            .map_err(|source| GatewayError::Unavailable {
                upstream: Upstream::Auth,
                source,
            })?;
        if auth.status != StatusCode::OK {
            return Err(GatewayError::UpstreamRejected {
                upstream: Upstream::Auth,
                status: auth.status,
                content_type: auth.headers.get(CONTENT_TYPE).cloned(),
                body: auth.body,
            });
        }
        let primary: Value = serde_json::from_slice(&auth.body).map_err(|source| {
            GatewayError::InvalidUpstreamPayload {
                upstream: Upstream::Auth,
                source,
            }
        })?;

        let (secondary, secondary_status) = profile_document(username, results.take(Upstream::Profile));
        Ok(merge(primary, secondary.as_ref(), secondary_status))
    }

    /// Split an update across both services, then return the fresh unified view.
    pub async fn unified_update(
        &self,
        username: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Value> {
        require_credential(headers)?;
        let document = update_document(body)?;

        let parts = partition(document);
        let mut calls = Vec::with_capacity(2);
        if !parts.auth.is_empty() {
            let call = UpstreamCall::new(
                Upstream::Auth,
                Method::PATCH,
                self.urls.endpoint(Upstream::Auth, &["accounts", username]),
                headers.clone(),
            )
            .with_json(&parts.auth)
            .map_err(|source| GatewayError::Encode {
                upstream: Upstream::Auth,
                source,
            })?;
            calls.push(call);
        }
        if !parts.profile.is_empty() {
            let call = UpstreamCall::new(
                Upstream::Profile,
                Method::PUT,
                self.urls.endpoint(Upstream::Profile, &["profiles", "me"]),
                headers.clone(),
            )
            .with_json(&parts.profile)
            .map_err(|source| GatewayError::Encode {
                upstream: Upstream::Profile,
                source,
            })?;
            calls.push(call);
        }

        tracing::debug!(
            username = %username,
            auth_fields = parts.auth.len(),
            profile_fields = parts.profile.len(),
            "Dispatching unified update"
        );
        let results = fan_out(&self.client, calls).await;

        let failures: Vec<String> = [Upstream::Auth, Upstream::Profile]
            .into_iter()
            .filter_map(|name| results.get(name))
            .filter_map(describe_failure)
            .collect();
        if !failures.is_empty() {
            tracing::warn!(username = %username, failures = ?failures, "Unified update failed");
            return Err(GatewayError::PartialUpdate(failures));
        }

        self.unified_read(username, headers).await
    }

    /// Delete the account and, on 200, announce it to the orchestrator
    /// without waiting for the outcome.
    pub async fn delete_user(&self, username: &str, headers: &HeaderMap) -> Result<UpstreamResponse> {
        let credential = require_credential(headers)?;
        let response = self
            .forward(
                Upstream::Auth,
                Method::DELETE,
                &["accounts", username],
                None,
                headers,
                None,
            )
            .await?;

        if response.status == StatusCode::OK {
            // Detached; a failed publish never alters this response.
            drop(self.events.publish_user_deleted(username, credential));
        }
        Ok(response)
    }

    /// Single-upstream pass-through. Any status is returned as-is.
    pub async fn forward(
        &self,
        upstream: Upstream,
        method: Method,
        segments: &[&str],
        query: Option<&str>,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<UpstreamResponse> {
        let mut url = self.urls.endpoint(upstream, segments);
        url.set_query(query);

        let mut call = UpstreamCall::new(upstream, method, url, headers.clone());
        if let Some(body) = body {
            call = call.with_body(body);
        }
        self.client
            .call(call)
            .await
            .outcome
            .map_err(|source| GatewayError::Unavailable { upstream, source })
    }
}

/// The inbound `Authorization` header, required before any upstream call.
pub fn require_credential(headers: &HeaderMap) -> Result<HeaderValue> {
    headers
        .get(AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(GatewayError::MissingCredential)
}

/// A JSON object, or `null` standing for an empty update.
fn update_document(body: &[u8]) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| GatewayError::MalformedBody(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(GatewayError::MalformedBody(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn outcome_of(
    result: Option<UpstreamResult>,
    name: Upstream,
) -> std::result::Result<UpstreamResponse, TransportError> {
    match result {
        Some(result) => result.outcome,
        None => Err(TransportError::TaskFailed(format!("no result for {name}"))),
    }
}

/// Profile body and status for the merger. Anything unusable degrades to "no enrichment".
fn profile_document(
    username: &str,
    result: Option<UpstreamResult>,
) -> (Option<Value>, Option<StatusCode>) {
    let response = match result.map(|r| r.outcome) {
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            tracing::warn!(username = %username, error = %e, "Profile data unavailable");
            return (None, None);
        }
        None => return (None, None),
    };

    if response.status != StatusCode::OK {
        tracing::debug!(
            username = %username,
            status = response.status.as_u16(),
            "Profile service returned no data"
        );
        return (None, Some(response.status));
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(document) => (Some(document), Some(response.status)),
        Err(e) => {
            tracing::warn!(username = %username, error = %e, "Could not parse profile data");
            (None, Some(response.status))
        }
    }
}

fn describe_failure(result: &UpstreamResult) -> Option<String> {
    match &result.outcome {
        Err(e) => Some(format!("{}: {}", result.name, e)),
        Ok(response) if response.status != StatusCode::OK => Some(format!(
            "{} returned status {}",
            result.name,
            response.status.as_u16()
        )),
        Ok(_) => None,
    }
}
